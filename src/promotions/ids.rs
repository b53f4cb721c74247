use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::PromotionConfig;

static NON_SLUG: OnceLock<Regex> = OnceLock::new();

/// Lowercase ASCII slug. Accents are folded onto their base letter first,
/// so `Café` and `Cafe` share a slug.
pub fn slugify(s: &str) -> String {
    let re = NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Invalid slug pattern"));
    let folded: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
    re.replace_all(&folded.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Fills in missing ids as `promo_{slug}_{index}`, where index is the
/// position in the config list. Explicit ids are left alone.
pub fn assign_ids(mut configs: Vec<PromotionConfig>) -> Vec<PromotionConfig> {
    let mut taken: HashSet<String> = configs
        .iter()
        .filter(|c| !c.id.trim().is_empty())
        .map(|c| c.id.clone())
        .collect();

    for (index, config) in configs.iter_mut().enumerate() {
        if !config.id.trim().is_empty() {
            continue;
        }

        let base = format!("promo_{}_{}", slugify(&config.item_key), index);
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }

        info!("Generated promotion id {} for {}", candidate, config.item_key);
        taken.insert(candidate.clone());
        config.id = candidate;
    }

    configs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(id: &str, item_key: &str) -> PromotionConfig {
        PromotionConfig {
            id: id.into(),
            item_key: item_key.into(),
            label: String::new(),
            start_date: None,
            end_date: None,
            daily_view_limit: None,
            priority: None,
            active: true,
        }
    }

    #[test]
    fn slug_collapses_and_trims_separators() {
        assert_eq!(slugify("  DevCenter -- Code! "), "devcenter_code");
        assert_eq!(slugify("Rust/WASM 2.0"), "rust_wasm_2_0");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn accents_fold_to_base_letters() {
        assert_eq!(slugify("Café Ñandú"), "cafe_nandu");
        assert_eq!(slugify("Programación Básica"), "programacion_basica");
        let configs = assign_ids(vec![promo("", "Café Ñandú")]);
        assert_eq!(configs[0].id, "promo_cafe_nandu_0");
    }

    #[test]
    fn missing_ids_are_derived_from_position() {
        let configs = assign_ids(vec![
            promo("", "DevCenter Code"),
            promo("custom", "Other"),
            promo("", "DevCenter Code"),
        ]);
        let ids: Vec<&str> = configs.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["promo_devcenter_code_0", "custom", "promo_devcenter_code_2"]);
    }

    #[test]
    fn derived_id_avoids_explicit_collision() {
        let configs = assign_ids(vec![promo("", "A"), promo("promo_a_0", "B")]);
        assert_eq!(configs[0].id, "promo_a_0_2");
        assert_eq!(configs[1].id, "promo_a_0");
    }

    #[test]
    fn assignment_is_stable() {
        let once = assign_ids(vec![promo("", "A"), promo("", "B")]);
        let twice = assign_ids(once.clone());
        assert_eq!(once, twice);
    }
}
