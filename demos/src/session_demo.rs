use conduit_rust::prelude::*;
use conduit_rust::gateway::types::FeedParams;
use dotenv::dotenv;
use std::env;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load CONDUIT_* settings from .env
    dotenv().ok();
    pretty_env_logger::init();

    let conduit = Conduit::from_env()?;
    println!("API base URL: {}", conduit.api().base_url());

    let mut notifications = conduit.notifications();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            println!(
                "[{}] {}: {}",
                notification.severity.color(),
                notification.title,
                notification.message
            );
        }
    });

    conduit.initialize().await;
    println!("Restored session: {:?}", conduit.session().status());

    if !conduit.session().token_ready() {
        let (email, password) = match (env::var("CONDUIT_EMAIL"), env::var("CONDUIT_PASSWORD")) {
            (Ok(email), Ok(password)) => (email, password),
            _ => {
                println!("Set CONDUIT_EMAIL and CONDUIT_PASSWORD to sign in");
                return Ok(());
            }
        };

        let user = conduit.sign_in(LoginForm::new(email, password)).await?;
        println!("Signed in as {}", user.username);
    }

    let mut pagination = Pagination::default();
    let feed = conduit.feed(pagination.feed_params()).await?;
    pagination.set_total_count(feed.articles_count);
    println!(
        "Feed: {} articles over {} pages",
        feed.articles_count,
        pagination.total_pages()
    );
    for article in &feed.articles {
        println!("- {} by {}", article.title, article.author.username);
    }

    if env::var("CONDUIT_SIGN_OUT").is_ok() {
        conduit.sign_out();
        let refused = conduit.feed(FeedParams::default()).await;
        println!("Feed after sign out: {:?}", refused.map(|feed| feed.articles_count));
    }

    Ok(())
}
