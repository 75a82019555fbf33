//! Feature listing command implementation.

use super::banner;
use anyhow::Result;
use ronda::features::FeatureCategory;
use ronda::features::registry::{at_publish_features, features_by_category};

/// List available features, optionally filtered by category.
pub(crate) fn list_features(category: Option<String>, verbose: bool) -> Result<()> {
    banner("Available Features");

    let allowed = at_publish_features();

    for cat in FeatureCategory::ALL {
        if let Some(ref filter) = category
            && !cat.as_str().contains(&filter.to_lowercase())
        {
            continue;
        }

        let features = features_by_category(cat);
        if features.is_empty() {
            continue;
        }

        println!("{} ({}):", cat.as_str(), cat.description());
        println!("{}", "-".repeat(60));

        for info in features {
            let marker = if allowed.contains(&info.name) { " " } else { "*" };
            if verbose {
                println!("{marker} {:28} - {}", info.name, info.description);
            } else {
                println!("{marker} {}", info.name);
            }
        }
        println!();
    }

    if !verbose {
        println!("Use --verbose for detailed feature descriptions.");
    }
    println!("Features marked * are excluded from at-publish forecasting.\n");

    Ok(())
}
