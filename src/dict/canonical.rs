use crate::source::Module;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Wealth-module retirement variables end in a two-digit topic suffix,
/// optionally followed by `A` for the accuracy variant.
static IRA_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(1[3-9]|20)(A?)$").unwrap());

static IRA_TAIL_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("13", "ira_any"),
        ("14", "ira_num"),
        ("15", "ira_balance"),
        ("16", "ira_contrib"),
        ("17", "ira_withdrawal"),
        ("18", "ira_type"),
        ("19", "ira_aux1"),
        ("20", "ira_aux2"),
    ])
});

static WAVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\(W\d+\)").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((19|20)\d{2}|\d{2})\b").unwrap());
static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s/]+").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

static STOP_TOKENS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "imp", "acc", "wtr", "whether", "ever", "any", "of", "the", "a", "an", "and", "or",
        "to", "in", "for", "by", "head", "hh", "household",
    ]
});

static SYNONYMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("annuity/ira", "ira"),
        ("iras", "ira"),
        ("stock market", "stocks"),
        ("stock", "stocks"),
        ("home equity", "home_equity"),
        ("other assets", "other_assets"),
        ("other asset", "other_assets"),
        ("vehicle", "vehicles"),
        ("balance", "value"),
        ("accounts", "acct"),
        ("account", "acct"),
        ("mortgages", "mortgage"),
    ]
    .into_iter()
    .map(|(from, to)| {
        let re = Regex::new(&format!(r"\b{}\b", regex::escape(from))).unwrap();
        (re, to)
    })
    .collect()
});

/// Map a source code (plus its label) to a (concept, category) pair.
/// Total and deterministic: named rules first, then a label-derived concept,
/// then the module fallback for codes whose label normalizes to nothing.
pub fn canonical_for(module: Module, code: &str, label: &str) -> (String, String) {
    match module {
        Module::Wealth => wealth_canonical(code, label),
        Module::Family => family_canonical(code, label),
    }
}

fn wealth_canonical(code: &str, label: &str) -> (String, String) {
    let code = code.trim();
    if let Some(cap) = IRA_SUFFIX_RE.captures(code) {
        if let Some(base) = IRA_TAIL_MAP.get(&cap[1]) {
            let concept = if cap[2].is_empty() {
                (*base).to_string()
            } else {
                format!("{}_a", base.to_lowercase())
            };
            return (concept, "Retirement/IRA".to_string());
        }
    }
    let concept = concept_from_label(label)
        .unwrap_or_else(|| format!("wlth_{}", code.to_lowercase()));
    (concept, "Assets/Debt".to_string())
}

fn family_canonical(code: &str, label: &str) -> (String, String) {
    let up = code.trim().to_uppercase();
    if up == "FEMALE" {
        return ("sex_head_female".into(), "Demographics".into());
    }
    if up == "CHILD" {
        return ("num_children".into(), "Demographics".into());
    }
    if up.starts_with("HAD_") {
        return ("head_presence_flag".into(), "Demographics".into());
    }
    let concept = concept_from_label(label)
        .unwrap_or_else(|| format!("fam_{}", code.trim().to_lowercase()));
    (concept, "FAM/Unknown".to_string())
}

/// Normalize a human-readable label into a stable, year-independent concept
/// key: case-fold, strip wave markers / year tokens / punctuation / stop
/// words, apply the synonym table, join with underscores. Returns `None`
/// when normalization leaves too little to name a concept.
pub fn concept_from_label(label: &str) -> Option<String> {
    let s = label.to_lowercase();
    let s = WAVE_RE.replace_all(&s, " ");
    let s = YEAR_RE.replace_all(&s, " ");
    let s = PUNCT_RE.replace_all(&s, " ");

    let mut kept: Vec<&str> = Vec::new();
    for token in WS_RE.split(s.trim()) {
        if token.is_empty() || STOP_TOKENS.contains(&token) || DIGITS_RE.is_match(token) {
            continue;
        }
        kept.push(token);
    }
    let mut phrase = kept.join(" ");
    for (re, to) in SYNONYMS.iter() {
        phrase = re.replace_all(&phrase, *to).into_owned();
    }
    let phrase = WS_RE.replace_all(phrase.trim(), "_").into_owned();
    if phrase.len() < 3 {
        None
    } else {
        Some(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ira_codes_map_to_named_concepts() {
        let (concept, category) = canonical_for(Module::Wealth, "S515", "");
        assert_eq!(concept, "ira_balance");
        assert_eq!(category, "Retirement/IRA");

        let (concept, _) = canonical_for(Module::Wealth, "S513", "");
        assert_eq!(concept, "ira_any");

        // accuracy variant
        let (concept, _) = canonical_for(Module::Wealth, "S515A", "");
        assert_eq!(concept, "ira_balance_a");
    }

    #[test]
    fn family_named_rules() {
        assert_eq!(
            canonical_for(Module::Family, "FEMALE", "").0,
            "sex_head_female"
        );
        assert_eq!(canonical_for(Module::Family, "CHILD", "").0, "num_children");
        assert_eq!(
            canonical_for(Module::Family, "HAD_1999", "").0,
            "head_presence_flag"
        );
    }

    #[test]
    fn label_normalization_is_year_independent() {
        let a = concept_from_label("VALUE OF STOCKS (W6) 99").unwrap();
        let b = concept_from_label("Value of Stocks (W12) 2003").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "value_stocks");
    }

    #[test]
    fn synonyms_collapse_variants() {
        let a = concept_from_label("ANNUITY/IRA BALANCE").unwrap();
        let b = concept_from_label("IRAS VALUE").unwrap();
        assert_eq!(a, "ira_value");
        assert_eq!(b, "ira_value");
    }

    #[test]
    fn empty_label_falls_back_to_code() {
        let (concept, category) = canonical_for(Module::Family, "ER13002", "  ");
        assert_eq!(concept, "fam_er13002");
        assert_eq!(category, "FAM/Unknown");
        let (concept, _) = canonical_for(Module::Wealth, "S999", "99");
        assert_eq!(concept, "wlth_s999");
    }

    #[test]
    fn mapping_is_deterministic() {
        let first = canonical_for(Module::Wealth, "S616", "IRA CONTRIBUTION");
        let second = canonical_for(Module::Wealth, "S616", "IRA CONTRIBUTION");
        assert_eq!(first, second);
    }
}
