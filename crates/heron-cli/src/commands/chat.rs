use anyhow::Result;
use console::style;

use heron::models::message::Message;
use heron::providers::base::ToolChoice;

use super::{build_provider, ProviderVariant};

/// Single round-trip walkthrough: one user message, one completion, no tools.
pub async fn run(variant: ProviderVariant, message: &str) -> Result<()> {
    println!("{}", style("=== Basic Chat ===").bold());
    println!("Provider: {:?}\n", variant);

    let provider = build_provider(variant)?;

    let messages = vec![Message::user().with_text(message)];
    let completion = provider
        .complete(
            "You are a helpful assistant.",
            &messages,
            &[],
            &ToolChoice::Auto,
        )
        .await?;

    println!("Response: {}", completion.message.text());
    if let Some(total) = completion.usage.total_tokens {
        println!("{}", style(format!("({} tokens)", total)).dim());
    }

    Ok(())
}
