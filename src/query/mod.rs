//! Query translation
//!
//! Maps a canonical [`Target`] onto each backend's native query language:
//! - Hunter: `ip="1.2.3.4"`, `domain.suffix="example.com"`
//! - FOFA: `ip="1.2.3.4"`, `domain="example.com"`
//! - Quake: `ip:1.2.3.4`, `domain:example.com`
//!
//! Company names become a disjunction over every field a company can be
//! indexed under.

use crate::results::{Target, TargetKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a field/value pair is written in a backend's query language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `field="value"`
    Quoted,
    /// `field:value`
    Colon,
    /// `field=="value"`
    ExactQuoted,
}

impl Operator {
    fn render(&self, field: &str, value: &str) -> String {
        match self {
            Self::Quoted => format!("{}=\"{}\"", field, escape(value)),
            Self::Colon => format!("{}:{}", field, value),
            Self::ExactQuoted => format!("{}==\"{}\"", field, escape(value)),
        }
    }
}

/// Query syntax of one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub ip_field: String,
    pub domain_field: String,
    pub operator: Operator,
}

impl Dialect {
    pub fn new(ip_field: &str, domain_field: &str, operator: Operator) -> Self {
        Self {
            ip_field: ip_field.to_string(),
            domain_field: domain_field.to_string(),
            operator,
        }
    }

    fn render(&self, target: &Target) -> String {
        let field = match target.kind {
            TargetKind::Ip => &self.ip_field,
            TargetKind::Domain => &self.domain_field,
        };
        self.operator.render(field, &target.value)
    }
}

/// Fields a company name is matched against
pub const COMPANY_FIELDS: &[&str] = &[
    "company",
    "title",
    "banner",
    "html_banner",
    "component",
    "ssl_info.detail",
];

/// Data-driven translator keyed by lowercase backend name
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    dialects: HashMap<String, Dialect>,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        let mut translator = Self::empty();
        translator.register("hunter", Dialect::new("ip", "domain.suffix", Operator::Quoted));
        translator.register("fofa", Dialect::new("ip", "domain", Operator::Quoted));
        translator.register("quake", Dialect::new("ip", "domain", Operator::Colon));
        translator
    }
}

impl QueryTranslator {
    /// Translator that knows no backends
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Register or replace the dialect of a backend
    pub fn register(&mut self, backend: &str, dialect: Dialect) {
        self.dialects.insert(backend.to_lowercase(), dialect);
    }

    /// Whether `backend` has a registered dialect
    pub fn supports(&self, backend: &str) -> bool {
        self.dialects.contains_key(&backend.to_lowercase())
    }

    /// Native query for `target` on `backend`.
    ///
    /// Returns an empty string for unknown backends or blank targets; the
    /// caller skips the backend in that case.
    pub fn translate(&self, backend: &str, target: &Target) -> String {
        if target.value.trim().is_empty() {
            return String::new();
        }
        self.dialects
            .get(&backend.to_lowercase())
            .map(|dialect| dialect.render(target))
            .unwrap_or_default()
    }

    /// Disjunction matching `company` under any of [`COMPANY_FIELDS`]
    pub fn translate_company(&self, company: &str) -> String {
        let company = company.trim();
        if company.is_empty() {
            return String::new();
        }
        COMPANY_FIELDS
            .iter()
            .map(|field| Operator::ExactQuoted.render(field, company))
            .collect::<Vec<_>>()
            .join("||")
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hunter_queries() {
        let translator = QueryTranslator::default();
        assert_eq!(
            translator.translate("Hunter", &Target::ip("93.184.216.34")),
            r#"ip="93.184.216.34""#
        );
        assert_eq!(
            translator.translate("hunter", &Target::domain("example.com")),
            r#"domain.suffix="example.com""#
        );
    }

    #[test]
    fn test_fofa_queries() {
        let translator = QueryTranslator::default();
        assert_eq!(
            translator.translate("FOFA", &Target::domain("example.com")),
            r#"domain="example.com""#
        );
    }

    #[test]
    fn test_quake_queries() {
        let translator = QueryTranslator::default();
        assert_eq!(
            translator.translate("quake", &Target::ip("1.2.3.4")),
            "ip:1.2.3.4"
        );
        assert_eq!(
            translator.translate("quake", &Target::domain("example.com")),
            "domain:example.com"
        );
    }

    #[test]
    fn test_unknown_backend_is_empty() {
        let translator = QueryTranslator::default();
        assert!(translator.translate("shodan", &Target::ip("1.2.3.4")).is_empty());
        assert!(translator.translate("fofa", &Target::ip("  ")).is_empty());
    }

    #[test]
    fn test_custom_dialect() {
        let mut translator = QueryTranslator::empty();
        translator.register("Shodan", Dialect::new("ip", "hostname", Operator::Colon));
        assert!(translator.supports("shodan"));
        assert_eq!(
            translator.translate("shodan", &Target::domain("example.com")),
            "hostname:example.com"
        );
    }

    #[test]
    fn test_company_query() {
        let translator = QueryTranslator::default();
        let query = translator.translate_company("Acme Ltd");
        assert!(query.starts_with(r#"company=="Acme Ltd"||title=="Acme Ltd""#));
        assert!(query.ends_with(r#"ssl_info.detail=="Acme Ltd""#));
        assert_eq!(query.matches("||").count(), COMPANY_FIELDS.len() - 1);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let translator = QueryTranslator::default();
        let query = translator.translate_company(r#"Acme "Blue" Inc"#);
        assert!(query.contains(r#"company=="Acme \"Blue\" Inc""#));
    }
}
