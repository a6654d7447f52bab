use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use oohquote_core::catalog::RateCard;
use oohquote_core::config::{AppConfig, LoadOptions};
use oohquote_core::domain::format::{FormatId, LocationId};
use oohquote_core::pricing::{price_line_item, LineItemPricingInput, PricingSettings};

use crate::commands::CommandResult;

#[derive(Debug)]
pub struct PriceRequest {
    pub rate_card: PathBuf,
    pub format: String,
    pub quantity: u32,
    pub periods: Vec<u32>,
    pub locations: Vec<String>,
    pub creative_assets: u32,
    pub category: Option<String>,
}

pub fn run(request: PriceRequest) -> CommandResult {
    let settings = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => PricingSettings::from(&config.pricing),
        Err(error) => {
            return CommandResult::failure(
                "price",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let raw = match fs::read_to_string(&request.rate_card) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "price",
                "rate_card_io",
                format!("could not read rate card `{}`: {error}", request.rate_card.display()),
                4,
            );
        }
    };
    let catalog: RateCard = match toml::from_str(&raw) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure(
                "price",
                "rate_card_parse",
                format!("could not parse rate card `{}`: {error}", request.rate_card.display()),
                4,
            );
        }
    };

    let input = LineItemPricingInput {
        format_id: FormatId(request.format),
        locations: request
            .locations
            .into_iter()
            .map(LocationId)
            .collect::<BTreeSet<LocationId>>(),
        quantity: request.quantity,
        selected_periods: request.periods,
        creative_asset_count: request.creative_assets,
        category: request.category,
    };

    let pricing = match price_line_item(&input, &catalog, &settings) {
        Ok(pricing) => pricing,
        Err(error) => {
            return CommandResult::failure("price", "pricing", error.to_string(), 1);
        }
    };

    match serde_json::to_value(&pricing) {
        Ok(data) => CommandResult::success_with_data("price", "priced one line item", data),
        Err(error) => CommandResult::failure("price", "serialization", error.to_string(), 3),
    }
}
