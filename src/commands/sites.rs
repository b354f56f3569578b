use anyhow::Result;

use newsharvest::config::Config;
use newsharvest::site::NextPageStrategy;
use newsharvest::utils::extract_domain;

pub fn sites(config: &Config) -> Result<()> {
    let registry = config.registry()?;

    println!("Registered sites ({})", registry.len());
    println!("=====================");

    for adapter in registry.iter() {
        let site = adapter.config();
        let host = extract_domain(&site.start_url).unwrap_or_else(|_| site.start_url.clone());

        println!("\n{} ({host})", site.id);
        println!("  Start URL: {}", site.start_url);
        match &site.next_page {
            NextPageStrategy::LinkSelector { selector } => {
                println!("  Pagination: {} `{selector}`", site.next_page.name());
            }
            NextPageStrategy::CounterTemplate {
                template,
                first_page,
                max_page,
            } => {
                println!(
                    "  Pagination: {} {template} (pages {first_page}..={max_page})",
                    site.next_page.name()
                );
            }
        }
        println!("  Listing: `{}` > `{}`", site.listing_container, site.link);
        println!("  Article: title `{}`, content `{}`", site.title, site.content);
    }

    Ok(())
}
