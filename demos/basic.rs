//! Basic usage example with the in-memory backend.

use berglas_provider::backends::memory::MemoryBackend;
use berglas_provider::factory::FnFactory;
use berglas_provider::Provider;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let factory = FnFactory::new(|_tokens| Ok(Arc::new(MemoryBackend::new())));
    let provider = Provider::new(env!("CARGO_PKG_VERSION"), Arc::new(factory));

    // A literal access token keeps the example offline
    if let Err(diags) = provider
        .configure_with_env(json!({"access_token": "ya29.example"}), |_| None)
        .await
    {
        for d in diags {
            eprintln!("configure failed: {}", d.summary);
        }
        return;
    }
    println!("Provider {} configured", provider.version());

    let ctx = CancellationToken::new();
    let steps = async {
        let created = provider
            .create(
                "berglas_secret",
                &ctx,
                json!({
                    "bucket": "gs://my-secrets",
                    "name": "api-key",
                    "key": "projects/p/locations/global/keyRings/r/cryptoKeys/k",
                    "plaintext": "sk-secret123",
                }),
            )
            .await?;
        println!("Created {}", created["id"]);

        let mut next = created.clone();
        next["plaintext"] = json!("sk-rotated456");
        let updated = provider
            .update("berglas_secret", &ctx, created, next)
            .await?;
        println!("Updated {}", updated["id"]);

        let first = provider
            .read_data_source(
                "berglas_secret",
                &ctx,
                json!({"bucket": "my-secrets", "name": "api-key", "generation": 1}),
            )
            .await?;
        println!("Generation 1 plaintext: {}", first["plaintext"]);

        let imported = provider
            .import("berglas_secret", &ctx, "my-secrets/api-key")
            .await?;
        println!("Imported latest generation {}", imported[0]["generation"]);

        provider.delete("berglas_secret", &ctx, updated).await?;
        println!("Deleted my-secrets/api-key");
        Ok::<_, berglas_provider::Diagnostics>(())
    };

    if let Err(diags) = steps.await {
        for d in diags {
            eprintln!("error: {}", d.summary);
        }
    }
}
