//! Relevance query compiler
//!
//! Turns a free-text query into an Elasticsearch `_search` request body.
//!
//! - A query wrapped in one pair of double quotes is a strict phrase search,
//!   ranked by score and then recency.
//! - Anything else blends three strategies (exact phrase, typo-tolerant fuzzy
//!   match, prefix match for partial typing) and multiplies the blended score
//!   by a recency decay on `updated_at`.
//!
//! Compilation is pure: the same input always yields the same request.

use serde_json::{json, Value};

/// Engine request body, consumed once by the search facade
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery(Value);

impl CompiledQuery {
    /// The JSON request body
    pub fn body(&self) -> &Value {
        &self.0
    }

    pub fn into_body(self) -> Value {
        self.0
    }
}

/// Number of titles an autocomplete request asks for
pub const SUGGESTION_LIMIT: usize = 5;

/// Returns the inner text when `query` is wrapped in one pair of double quotes
///
/// A lone `"` is not a quoted query.
pub fn quoted_phrase(query: &str) -> Option<&str> {
    if query.len() >= 2 && query.starts_with('"') && query.ends_with('"') {
        Some(&query[1..query.len() - 1])
    } else {
        None
    }
}

/// Compiles `query` into a search request for one page of results
///
/// # Arguments
///
/// * `query` - The user's query text
/// * `offset` - Index of the first hit to return (`from`)
/// * `limit` - Page size (`size`)
///
/// # Returns
///
/// The request body. `offset` and `limit` are passed through verbatim.
pub fn compile(query: &str, offset: usize, limit: usize) -> CompiledQuery {
    match quoted_phrase(query) {
        Some(phrase) => compile_phrase(phrase, offset, limit),
        None => compile_blended(query, offset, limit),
    }
}

fn compile_phrase(phrase: &str, offset: usize, limit: usize) -> CompiledQuery {
    CompiledQuery(json!({
        "query": {
            "multi_match": {
                "query": phrase,
                "fields": ["title^3", "body^1"],
                "type": "phrase"
            }
        },
        "from": offset,
        "size": limit,
        "sort": [
            { "_score": { "order": "desc" } },
            { "updated_at": { "order": "desc" } }
        ],
        "highlight": {
            "fields": {
                "title": {},
                "body": {}
            },
            "pre_tags": ["<mark>"],
            "post_tags": ["</mark>"]
        }
    }))
}

fn compile_blended(query: &str, offset: usize, limit: usize) -> CompiledQuery {
    CompiledQuery(json!({
        "query": {
            "function_score": {
                "query": {
                    "bool": {
                        "should": [
                            {
                                "multi_match": {
                                    "query": query,
                                    "fields": ["title^5", "body^2"],
                                    "type": "phrase",
                                    "boost": 10
                                }
                            },
                            {
                                "multi_match": {
                                    "query": query,
                                    "fields": ["title^3", "body^1"],
                                    "fuzziness": "AUTO",
                                    "boost": 5
                                }
                            },
                            {
                                "multi_match": {
                                    "query": query,
                                    "fields": ["title^2", "body^1"],
                                    "type": "phrase_prefix",
                                    "boost": 3
                                }
                            }
                        ],
                        "minimum_should_match": 1
                    }
                },
                "boost_mode": "multiply",
                "functions": [
                    {
                        "gauss": {
                            "updated_at": {
                                "origin": "now",
                                "scale": "30d",
                                "decay": 0.5
                            }
                        },
                        "weight": 1.2
                    }
                ]
            }
        },
        "from": offset,
        "size": limit,
        "sort": [
            { "_score": { "order": "desc" } }
        ],
        "highlight": {
            "fields": {
                "title": { "fragment_size": 150 },
                "body": { "fragment_size": 300 }
            },
            "pre_tags": ["<mark>"],
            "post_tags": ["</mark>"]
        }
    }))
}

/// Compiles an autocomplete request for titles starting with `prefix`
///
/// Prefix queries are not analyzed, so the prefix is lowercased to match the
/// indexed terms.
pub fn compile_suggest(prefix: &str) -> CompiledQuery {
    let prefix = prefix.to_lowercase();

    CompiledQuery(json!({
        "query": {
            "bool": {
                "should": [
                    { "prefix": { "title": prefix } },
                    { "prefix": { "body": prefix } }
                ]
            }
        },
        "size": SUGGESTION_LIMIT,
        "_source": ["title"]
    }))
}
