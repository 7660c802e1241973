//! Method to API namespace routing
//!
//! Golos nodes expose methods through `call` with an explicit plugin namespace. A
//! method missing from this table fails before anything is sent.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{GolosError, Result};

static API_METHODS: &[(&str, &[&str])] = &[
    (
        "database_api",
        &[
            "get_account_bandwidth",
            "get_account_count",
            "get_accounts",
            "get_block",
            "get_block_header",
            "get_chain_properties",
            "get_config",
            "get_conversion_requests",
            "get_database_info",
            "get_dynamic_global_properties",
            "get_escrow",
            "get_expiring_vesting_delegations",
            "get_hardfork_version",
            "get_next_scheduled_hardfork",
            "get_owner_history",
            "get_potential_signatures",
            "get_recovery_request",
            "get_required_signatures",
            "get_transaction_hex",
            "get_vesting_delegations",
            "get_withdraw_routes",
            "lookup_account_names",
            "lookup_accounts",
            "verify_account_authority",
            "verify_authority",
        ],
    ),
    ("account_history", &["get_account_history"]),
    ("operation_history", &["get_ops_in_block", "get_transaction"]),
    (
        "network_broadcast_api",
        &[
            "broadcast_block",
            "broadcast_transaction",
            "broadcast_transaction_synchronous",
            "broadcast_transaction_with_callback",
        ],
    ),
    (
        "witness_api",
        &[
            "get_active_witnesses",
            "get_current_median_history_price",
            "get_feed_history",
            "get_miner_queue",
            "get_witness_by_account",
            "get_witness_count",
            "get_witness_schedule",
            "get_witnesses",
            "get_witnesses_by_vote",
            "lookup_witness_accounts",
        ],
    ),
    (
        "market_history",
        &[
            "get_market_history",
            "get_market_history_buckets",
            "get_open_orders",
            "get_order_book",
            "get_order_book_extended",
            "get_recent_trades",
            "get_ticker",
            "get_trade_history",
            "get_volume",
        ],
    ),
    (
        "follow",
        &[
            "get_account_reputations",
            "get_blog",
            "get_blog_authors",
            "get_blog_entries",
            "get_feed",
            "get_feed_entries",
            "get_follow_count",
            "get_followers",
            "get_following",
            "get_reblogged_by",
        ],
    ),
    (
        "social_network",
        &[
            "get_account_votes",
            "get_active_votes",
            "get_all_content_replies",
            "get_content",
            "get_content_replies",
            "get_replies_by_last_update",
        ],
    ),
    (
        "tags",
        &[
            "get_discussions_by_active",
            "get_discussions_by_author_before_date",
            "get_discussions_by_blog",
            "get_discussions_by_cashout",
            "get_discussions_by_children",
            "get_discussions_by_comments",
            "get_discussions_by_created",
            "get_discussions_by_feed",
            "get_discussions_by_hot",
            "get_discussions_by_payout",
            "get_discussions_by_promoted",
            "get_discussions_by_trending",
            "get_discussions_by_votes",
            "get_tags_used_by_author",
            "get_trending_tags",
        ],
    ),
    ("account_by_key", &["get_key_references"]),
];

static METHOD_NAMESPACES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    API_METHODS
        .iter()
        .flat_map(|(api, methods)| methods.iter().map(move |method| (*method, *api)))
        .collect()
});

/// Namespace serving `method`, or `ApiNotFound` when it is not in the table.
pub fn namespace_for(method: &str) -> Result<&'static str> {
    METHOD_NAMESPACES
        .get(method)
        .copied()
        .ok_or_else(|| GolosError::ApiNotFound(method.to_string()))
}

pub fn known_methods() -> impl Iterator<Item = (&'static str, &'static str)> {
    API_METHODS
        .iter()
        .flat_map(|(api, methods)| methods.iter().map(move |method| (*method, *api)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_namespaces() {
        assert_eq!(namespace_for("get_dynamic_global_properties").unwrap(), "database_api");
        assert_eq!(namespace_for("get_transaction").unwrap(), "operation_history");
        assert_eq!(
            namespace_for("broadcast_transaction_synchronous").unwrap(),
            "network_broadcast_api"
        );
        assert_eq!(namespace_for("get_key_references").unwrap(), "account_by_key");
    }

    #[test]
    fn test_unknown_method() {
        assert_eq!(
            namespace_for("get_everything"),
            Err(GolosError::ApiNotFound("get_everything".to_string()))
        );
    }

    #[test]
    fn test_each_method_has_one_namespace() {
        assert_eq!(known_methods().count(), METHOD_NAMESPACES.len());
    }
}
