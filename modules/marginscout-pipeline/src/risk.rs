use marginscout_common::RiskTier;

/// Registered brands and character IP. Any hit is an immediate danger:
/// selling these without authorization is a takedown and a legal problem,
/// not a margin problem.
const BRAND_TERMS: &[&str] = &[
    "nike",
    "adidas",
    "gucci",
    "louis vuitton",
    "chanel",
    "supreme",
    "disney",
    "pokemon",
    "pikachu",
    "hello kitty",
    "sanrio",
    "lego",
    "marvel",
    "star wars",
    "apple",
    "samsung",
    "dyson",
];

/// Product classes that require import certification (electrical safety,
/// children's product safety). Sellable, but only after paperwork — a
/// human has to confirm before approving.
const CERTIFICATION_TERMS: &[&str] = &[
    "charger",
    "battery",
    "power bank",
    "adapter",
    "cable",
    "electric",
    "heater",
    "plug",
    "usb",
    "wireless",
    "bluetooth",
    "baby",
    "infant",
    "children",
    "kids",
    "toy",
];

/// Categories that are outright prohibited or unsellable on the target
/// marketplaces, plus off-platform payment bait that marks scam sellers.
const PROHIBITED_TERMS: &[&str] = &[
    "supplement",
    "vitamin",
    "medicine",
    "cosmetic",
    "skincare",
    "food",
    "vape",
    "e-cigarette",
    "tobacco",
    "liquor",
    "alcohol",
    "knife",
    "weapon",
    "lighter",
    "adult",
    "wechat pay",
    "paypal only",
    "direct deal",
    "contact seller directly",
];

/// Keyword-based compliance screen over listing text. Deterministic and
/// idempotent: the same text always yields the same tier and the same
/// reason list, with every matched term reported rather than just the
/// first. Matching is case-insensitive substring containment.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier;

impl RiskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify free text (typically title, or title + description).
    /// Brand or prohibited hits dominate certification hits.
    pub fn classify(&self, text: &str) -> (RiskTier, Vec<String>) {
        let haystack = text.to_lowercase();
        let mut reasons = Vec::new();
        let mut tier = RiskTier::Safe;

        for term in BRAND_TERMS {
            if haystack.contains(term) {
                reasons.push(format!("brand term: {term}"));
                tier = RiskTier::Danger;
            }
        }
        for term in PROHIBITED_TERMS {
            if haystack.contains(term) {
                reasons.push(format!("prohibited term: {term}"));
                tier = RiskTier::Danger;
            }
        }
        for term in CERTIFICATION_TERMS {
            if haystack.contains(term) {
                reasons.push(format!("certification required: {term}"));
                if tier == RiskTier::Safe {
                    tier = RiskTier::Warning;
                }
            }
        }

        (tier, reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_is_safe_with_no_reasons() {
        let classifier = RiskClassifier::new();
        let (tier, reasons) = classifier.classify("Foldable bamboo desk organizer tray");
        assert_eq!(tier, RiskTier::Safe);
        assert!(reasons.is_empty());
    }

    #[test]
    fn brand_term_is_danger_regardless_of_case() {
        let classifier = RiskClassifier::new();
        let (tier, reasons) = classifier.classify("NIKE style running shoes wholesale");
        assert_eq!(tier, RiskTier::Danger);
        assert_eq!(reasons, vec!["brand term: nike".to_string()]);
    }

    #[test]
    fn certification_term_alone_is_warning() {
        let classifier = RiskClassifier::new();
        let (tier, reasons) = classifier.classify("fast wall charger 20W");
        assert_eq!(tier, RiskTier::Warning);
        assert_eq!(reasons, vec!["certification required: charger".to_string()]);
    }

    #[test]
    fn all_matched_terms_are_reported_not_just_the_first() {
        let classifier = RiskClassifier::new();
        let (tier, reasons) =
            classifier.classify("Disney baby toy USB night light, direct deal welcome");
        assert_eq!(tier, RiskTier::Danger);
        assert!(reasons.contains(&"brand term: disney".to_string()));
        assert!(reasons.contains(&"prohibited term: direct deal".to_string()));
        assert!(reasons.contains(&"certification required: baby".to_string()));
        assert!(reasons.contains(&"certification required: toy".to_string()));
        assert!(reasons.contains(&"certification required: usb".to_string()));
        assert_eq!(reasons.len(), 5);
    }

    #[test]
    fn danger_dominates_warning_when_both_match() {
        let classifier = RiskClassifier::new();
        let (tier, _) = classifier.classify("herbal supplement bottle with usb cap");
        assert_eq!(tier, RiskTier::Danger);
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = RiskClassifier::new();
        let text = "lego compatible building blocks for kids";
        let first = classifier.classify(text);
        let second = classifier.classify(text);
        assert_eq!(first, second);
    }
}
