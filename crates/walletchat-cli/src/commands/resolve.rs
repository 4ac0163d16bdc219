use anyhow::Result;
use std::sync::Arc;
use walletchat_core::identity::IdentityResolver;
use walletchat_infrastructure::{ConfigService, HttpNameResolver};

pub async fn run(service: &ConfigService, target: &str) -> Result<()> {
    let config = service.get_config();
    let resolver = IdentityResolver::new(
        Arc::new(HttpNameResolver::from_config(&config.resolver)?),
        config.resolver.name_suffixes.clone(),
    );

    let resolved = resolver.resolve(target).await?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    tracing::debug!("resolved {} as {}", target, resolved.label());
    Ok(())
}
