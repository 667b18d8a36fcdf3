use conduit_rust::gateway::types::ArticleParams;
use conduit_rust::pagination::next_page_param;
use conduit_rust::prelude::*;
use dotenv::dotenv;
use std::env;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();

    let options = ClientOptions::from_env().with_persist_session(false);
    let conduit = Conduit::new(options)?;

    let tags = conduit.api().get_tags().await?;
    println!("Popular tags: {}", tags.tags.join(", "));

    let filters = ArticleParams {
        tag: env::var("CONDUIT_TAG").ok(),
        ..Default::default()
    };

    let mut pagination = Pagination::default();
    let mut pages_loaded = 0;
    loop {
        let page = conduit
            .api()
            .get_articles(&pagination.article_params(filters.clone()))
            .await?;
        pages_loaded += 1;
        pagination.set_total_count(page.articles_count);

        println!("Page {} of {}", pagination.current_page(), pagination.total_pages());
        for article in &page.articles {
            println!("- {} ({} favorites)", article.title, article.favorites_count);
        }

        if next_page_param(&page, pages_loaded, pagination.limit()).is_none() || pages_loaded >= 3 {
            break;
        }
        pagination.next_page();
    }

    log::info!("Fetched {} pages", pages_loaded);
    Ok(())
}
