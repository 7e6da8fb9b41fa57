use anyhow::Result;
use veil_adapters::AiServiceRegistry;
use veil_intercept::Route;

pub fn handle(url: &str) -> Result<()> {
    let registry = AiServiceRegistry::with_defaults();

    let Some(route) = Route::for_page(&registry, url) else {
        println!("No adapter handles {}", url);
        return Ok(());
    };

    let (path, adapter) = match &route {
        Route::Network(adapter) => ("network requests", adapter),
        Route::Dom(adapter) => ("page input", adapter),
    };
    println!("Adapter: {}", adapter.service_type());
    println!("  Intercepts: {}", path);
    println!("  Domains: {}", adapter.supported_domains().join(", "));

    Ok(())
}
