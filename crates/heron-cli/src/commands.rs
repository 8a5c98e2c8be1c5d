use anyhow::Result;
use clap::ValueEnum;

use heron::providers::base::Provider;
use heron::providers::configs::{AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig};
use heron::providers::factory::get_provider;

pub mod chat;
pub mod weather;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ProviderVariant {
    OpenAi,
    Anthropic,
}

/// Build a provider from environment configuration (.env is already loaded)
pub fn build_provider(variant: ProviderVariant) -> Result<Box<dyn Provider>> {
    match variant {
        ProviderVariant::OpenAi => {
            get_provider(ProviderConfig::OpenAi(OpenAiProviderConfig::from_env()?))
        }
        ProviderVariant::Anthropic => get_provider(ProviderConfig::Anthropic(
            AnthropicProviderConfig::from_env()?,
        )),
    }
}
