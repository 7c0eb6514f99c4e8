//! Keyword and URL-domain scoring over a set of vaults' entries. Peripheral
//! to the command log/replay/merge core, but part of the engine's public
//! surface (§2).

pub mod levenshtein;

use std::collections::BTreeMap;

use crate::datasource::DatasourceBackend;
use crate::error::IoError;
use crate::model::Vault;

/// A term-search hit: lower `score` is a closer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermHit {
    pub vault_id: String,
    pub entry_id: String,
    pub score: usize,
}

const TERM_FIELDS: [&str; 3] = ["title", "username", "url"];

/// Ranks entries across `vaults` against `query` over `title`/`username`/`url`
/// properties, using the default Levenshtein ranker.
pub fn search_terms(vaults: &[(&str, &Vault)], query: &str) -> Vec<TermHit> {
    search_terms_with(vaults, query, levenshtein::distance)
}

/// Same as [`search_terms`] with a caller-supplied ranker.
pub fn search_terms_with(
    vaults: &[(&str, &Vault)],
    query: &str,
    ranker: impl Fn(&str, &str) -> usize,
) -> Vec<TermHit> {
    let mut hits = Vec::new();
    for (vault_id, vault) in vaults {
        for entry in vault.entries.values() {
            let best = TERM_FIELDS
                .iter()
                .filter_map(|field| entry.properties.get(*field))
                .map(|value| ranker(query, value))
                .min();
            if let Some(score) = best {
                hits.push(TermHit { vault_id: vault_id.to_string(), entry_id: entry.id.clone(), score });
            }
        }
    }
    hits.sort_by_key(|h| h.score);
    hits
}

/// Extracts the lowercased host from a URL, tolerating a missing scheme.
pub fn host_of(url: &str) -> Option<String> {
    let without_scheme = url.split("://").last()?;
    let host = without_scheme.split(['/', '?', '#']).next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Two hosts are "related" if they're equal or one is a dot-suffix of the
/// other (`mail.example.com` relates to `example.com`).
fn hosts_related(a: &str, b: &str) -> bool {
    a == b || a.ends_with(&format!(".{b}")) || b.ends_with(&format!(".{a}"))
}

fn search_key(vault_id: &str) -> String {
    format!("bcup_search_{vault_id}")
}

fn hit_key(entry_id: &str, domain: &str) -> String {
    format!("{entry_id}\u{1}{domain}")
}

type HitCounts = BTreeMap<String, u64>;

fn load_hit_counts(backend: &dyn DatasourceBackend, vault_id: &str) -> HitCounts {
    match backend.get_file_contents(&search_key(vault_id)) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => HitCounts::default(),
    }
}

fn save_hit_counts(backend: &dyn DatasourceBackend, vault_id: &str, counts: &HitCounts) -> Result<(), IoError> {
    let bytes = serde_json::to_vec(counts).unwrap_or_default();
    backend.put_file_contents(&search_key(vault_id), &bytes)
}

/// A URL-search hit, ranked by `(domain_hit_count desc, distance asc)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlHit {
    pub vault_id: String,
    pub entry_id: String,
    pub domain_hit_count: u64,
    pub distance: usize,
}

/// Ranks entries whose `url` property has a host related to `query_url`'s,
/// using persisted per-`(vault, entry, domain)` hit counts as the primary
/// sort key and Levenshtein distance between hosts as the tiebreaker.
pub fn search_urls(backend: &dyn DatasourceBackend, vaults: &[(&str, &Vault)], query_url: &str) -> Vec<UrlHit> {
    let Some(query_host) = host_of(query_url) else { return Vec::new() };
    let mut hits = Vec::new();
    for (vault_id, vault) in vaults {
        let counts = load_hit_counts(backend, vault_id);
        for entry in vault.entries.values() {
            let Some(url) = entry.properties.get("url") else { continue };
            let Some(host) = host_of(url) else { continue };
            if !hosts_related(&query_host, &host) {
                continue;
            }
            let distance = levenshtein::distance(&query_host, &host);
            let domain_hit_count = counts.get(&hit_key(&entry.id, &host)).copied().unwrap_or(0);
            hits.push(UrlHit { vault_id: vault_id.to_string(), entry_id: entry.id.clone(), domain_hit_count, distance });
        }
    }
    hits.sort_by(|a, b| b.domain_hit_count.cmp(&a.domain_hit_count).then(a.distance.cmp(&b.distance)));
    hits
}

/// Records one visit of `entry_id`'s `url` in vault `vault_id`'s persisted
/// hit-count map. Idempotent up to integer overflow (saturating).
pub fn increment_score(
    backend: &dyn DatasourceBackend,
    vault_id: &str,
    entry_id: &str,
    url: &str,
) -> Result<(), IoError> {
    let Some(domain) = host_of(url) else { return Ok(()) };
    let mut counts = load_hit_counts(backend, vault_id);
    let counter = counts.entry(hit_key(entry_id, &domain)).or_insert(0);
    *counter = counter.saturating_add(1);
    save_hit_counts(backend, vault_id, &counts)
}
