//! Built-in marketing scenarios and edit suggestions.

use serde::Serialize;

/// A canned product placement with a fixed prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub prompt: &'static str,
}

pub const SCENARIOS: &[Scenario] = &[
    // Apparel: tops
    Scenario {
        id: "tshirt",
        label: "T-Shirt",
        icon: "👕",
        prompt: "Visualize this product design printed on the center of a plain white cotton t-shirt worn by a model in a casual setting.",
    },
    Scenario {
        id: "hoodie",
        label: "Hoodie",
        icon: "🧥",
        prompt: "Show this product design on a high-quality heather grey streetwear hoodie. The product branding should be visible on the chest.",
    },
    Scenario {
        id: "jacket_denim",
        label: "Denim Jacket",
        icon: "🧥",
        prompt: "Place this design as a patch or print on the back of a vintage blue denim jacket.",
    },
    Scenario {
        id: "jacket_bomber",
        label: "Bomber Jacket",
        icon: "✈️",
        prompt: "Visualize this product style integrated onto a sleek black bomber jacket worn by a fashion model.",
    },
    // Apparel: bottoms
    Scenario {
        id: "shorts",
        label: "Shorts",
        icon: "🩳",
        prompt: "Display this pattern or logo on a pair of athletic mesh shorts suitable for summer or sports.",
    },
    Scenario {
        id: "sweatpants",
        label: "Joggers",
        icon: "👖",
        prompt: "Show this design featured on the leg of comfortable cotton sweatpants/joggers in a studio setting.",
    },
    Scenario {
        id: "jeans",
        label: "Jeans",
        icon: "👖",
        prompt: "Apply this product aesthetic to the back pocket embroidery of a pair of classic blue jeans.",
    },
    // Headwear
    Scenario {
        id: "cap",
        label: "Baseball Cap",
        icon: "🧢",
        prompt: "Visualize this logo or design embroidered on the front of a classic structured baseball cap.",
    },
    Scenario {
        id: "beanie",
        label: "Beanie",
        icon: "❄️",
        prompt: "Show this product logo on a folded knitted beanie label, winter fashion style.",
    },
    // Accessories
    Scenario {
        id: "totebag",
        label: "Tote Bag",
        icon: "👜",
        prompt: "Print this design on a canvas tote bag hanging on a shoulder, lifestyle photography.",
    },
    Scenario {
        id: "mug",
        label: "Coffee Mug",
        icon: "☕",
        prompt: "Place this product realistically onto a generic white ceramic coffee mug sitting on a wooden table. Maintain the product branding and appearance perfectly.",
    },
    Scenario {
        id: "bottle",
        label: "Water Bottle",
        icon: "💧",
        prompt: "Apply this design to a stainless steel reusable water bottle, gym setting background.",
    },
    Scenario {
        id: "phonecase",
        label: "Phone Case",
        icon: "📱",
        prompt: "Visualize this pattern or image covering the back of a modern smartphone case.",
    },
    Scenario {
        id: "backpack",
        label: "Backpack",
        icon: "🎒",
        prompt: "Show this design applied to the front pocket area of a modern urban backpack.",
    },
    // Advertising
    Scenario {
        id: "billboard",
        label: "Billboard",
        icon: "🏙️",
        prompt: "Show this product displayed on a large digital billboard in a busy city intersection like Times Square. The product should be the main focus of the advertisement.",
    },
    Scenario {
        id: "magazine",
        label: "Magazine Ad",
        icon: "📰",
        prompt: "Create a glossy magazine advertisement layout featuring this product. Use professional studio lighting and a clean, minimalist background.",
    },
];

/// Starter prompts offered for free-form edits.
pub const EDIT_SUGGESTIONS: &[&str] = &[
    "Make it look vintage and worn",
    "Add a cyberpunk neon glow",
    "Turn it into a pencil sketch",
    "Place it on a marble countertop",
    "Add a snowy winter background",
    "Make it gold plated",
    "Set it on fire (visually)",
    "Underwater scene with bubbles",
];

/// Look up a scenario by id (case-insensitive).
pub fn find_scenario(id: &str) -> Option<&'static Scenario> {
    let id = id.trim();
    SCENARIOS.iter().find(|s| s.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(SCENARIOS.len(), 16);
        assert_eq!(EDIT_SUGGESTIONS.len(), 8);
    }

    #[test]
    fn test_scenario_ids_are_unique() {
        let ids: HashSet<_> = SCENARIOS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SCENARIOS.len());
    }

    #[test]
    fn test_find_scenario() {
        let mug = find_scenario("mug").unwrap();
        assert_eq!(mug.label, "Coffee Mug");
        assert!(mug.prompt.contains("ceramic coffee mug"));
        assert_eq!(find_scenario(" Billboard ").map(|s| s.id), Some("billboard"));
        assert!(find_scenario("spaceship").is_none());
    }

    #[test]
    fn test_prompts_are_not_empty() {
        assert!(SCENARIOS.iter().all(|s| !s.prompt.trim().is_empty()));
    }
}
