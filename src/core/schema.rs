//! Static operation schema registry
//!
//! Each operation name maps to its chain tag id and the ordered list of fields the
//! serializer writes. Field order on the wire is taken from here, never from the
//! order a caller happened to build the field map in.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{GolosError, Result};

/// How a single operation field is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Varint byte length followed by UTF-8 bytes
    String,
    /// One byte, 0 or 1
    Bool,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    /// `"0.100 GOLOS"`: i64 amount, precision byte, 7-byte NUL-padded symbol
    Amount,
    /// Prefixed Base58Check text decoded to the 33-byte compressed point
    PublicKey,
    /// Threshold, account weights and key weights
    Permission,
    /// Flag byte, then a permission when the flag is 1
    OptionalPermission,
    /// Count-prefixed, sorted and de-duplicated account names
    ArrayString,
    /// Count-prefixed `(tag, payload)` list where every tag uses the raw fallback
    Extensions,
    /// Like `Extensions`, with tag 0 carrying comment payout beneficiaries
    CommentExtensions,
}

/// Wire layout of one operation kind.
#[derive(Debug)]
pub struct OperationSchema {
    pub name: &'static str,
    pub id: u32,
    pub fields: &'static [(&'static str, WireType)],
}

use WireType::*;

static OPERATIONS: &[OperationSchema] = &[
    OperationSchema {
        name: "vote",
        id: 0,
        fields: &[
            ("voter", String),
            ("author", String),
            ("permlink", String),
            ("weight", Int16),
        ],
    },
    OperationSchema {
        name: "comment",
        id: 1,
        fields: &[
            ("parent_author", String),
            ("parent_permlink", String),
            ("author", String),
            ("permlink", String),
            ("title", String),
            ("body", String),
            ("json_metadata", String),
        ],
    },
    OperationSchema {
        name: "transfer",
        id: 2,
        fields: &[
            ("from", String),
            ("to", String),
            ("amount", Amount),
            ("memo", String),
        ],
    },
    OperationSchema {
        name: "transfer_to_vesting",
        id: 3,
        fields: &[("from", String), ("to", String), ("amount", Amount)],
    },
    OperationSchema {
        name: "withdraw_vesting",
        id: 4,
        fields: &[("account", String), ("vesting_shares", Amount)],
    },
    OperationSchema {
        name: "account_create",
        id: 9,
        fields: &[
            ("fee", Amount),
            ("creator", String),
            ("new_account_name", String),
            ("owner", Permission),
            ("active", Permission),
            ("posting", Permission),
            ("memo_key", PublicKey),
            ("json_metadata", String),
        ],
    },
    OperationSchema {
        name: "account_update",
        id: 10,
        fields: &[
            ("account", String),
            ("owner", OptionalPermission),
            ("active", OptionalPermission),
            ("posting", OptionalPermission),
            ("memo_key", PublicKey),
            ("json_metadata", String),
        ],
    },
    OperationSchema {
        name: "account_witness_vote",
        id: 12,
        fields: &[("account", String), ("witness", String), ("approve", Bool)],
    },
    OperationSchema {
        name: "account_witness_proxy",
        id: 13,
        fields: &[("account", String), ("proxy", String)],
    },
    OperationSchema {
        name: "delete_comment",
        id: 17,
        fields: &[("author", String), ("permlink", String)],
    },
    OperationSchema {
        name: "custom_json",
        id: 18,
        fields: &[
            ("required_auths", ArrayString),
            ("required_posting_auths", ArrayString),
            ("id", String),
            ("json", String),
        ],
    },
    OperationSchema {
        name: "comment_options",
        id: 19,
        fields: &[
            ("author", String),
            ("permlink", String),
            ("max_accepted_payout", Amount),
            ("percent_steem_dollars", Uint16),
            ("allow_votes", Bool),
            ("allow_curation_rewards", Bool),
            ("extensions", CommentExtensions),
        ],
    },
    OperationSchema {
        name: "set_withdraw_vesting_route",
        id: 20,
        fields: &[
            ("from_account", String),
            ("to_account", String),
            ("percent", Uint16),
            ("auto_vest", Bool),
        ],
    },
    OperationSchema {
        name: "change_recovery_account",
        id: 26,
        fields: &[
            ("account_to_recover", String),
            ("new_recovery_account", String),
            ("extensions", Extensions),
        ],
    },
    OperationSchema {
        name: "delegate_vesting_shares",
        id: 39,
        fields: &[
            ("delegator", String),
            ("delegatee", String),
            ("vesting_shares", Amount),
        ],
    },
    OperationSchema {
        name: "account_create_with_delegation",
        id: 40,
        fields: &[
            ("fee", Amount),
            ("delegation", Amount),
            ("creator", String),
            ("new_account_name", String),
            ("owner", Permission),
            ("active", Permission),
            ("posting", Permission),
            ("memo_key", PublicKey),
            ("json_metadata", String),
            ("extensions", Extensions),
        ],
    },
    OperationSchema {
        name: "account_metadata",
        id: 41,
        fields: &[("account", String), ("json_metadata", String)],
    },
    OperationSchema {
        name: "delegate_vesting_shares_with_interest",
        id: 47,
        fields: &[
            ("delegator", String),
            ("delegatee", String),
            ("vesting_shares", Amount),
            ("interest_rate", Uint16),
            ("extensions", Extensions),
        ],
    },
];

static REGISTRY: Lazy<HashMap<&'static str, &'static OperationSchema>> =
    Lazy::new(|| OPERATIONS.iter().map(|op| (op.name, op)).collect());

/// Look up an operation schema by name.
pub fn lookup(name: &str) -> Result<&'static OperationSchema> {
    REGISTRY
        .get(name)
        .copied()
        .ok_or_else(|| GolosError::UnknownOperation(name.to_string()))
}

pub fn operation_names() -> impl Iterator<Item = &'static str> {
    OPERATIONS.iter().map(|op| op.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_transfer() {
        let schema = lookup("transfer").unwrap();
        assert_eq!(schema.id, 2);
        let names: Vec<&str> = schema.fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["from", "to", "amount", "memo"]);
    }

    #[test]
    fn test_unknown_operation() {
        assert!(matches!(
            lookup("pow2"),
            Err(GolosError::UnknownOperation(name)) if name == "pow2"
        ));
    }

    #[test]
    fn test_ids_and_names_are_unique() {
        let ids: HashSet<u32> = OPERATIONS.iter().map(|op| op.id).collect();
        let names: HashSet<&str> = operation_names().collect();
        assert_eq!(ids.len(), OPERATIONS.len());
        assert_eq!(names.len(), OPERATIONS.len());
    }

    #[test]
    fn test_field_names_unique_per_operation() {
        for op in OPERATIONS {
            let names: HashSet<&str> = op.fields.iter().map(|(name, _)| *name).collect();
            assert_eq!(names.len(), op.fields.len(), "duplicate field in {}", op.name);
        }
    }
}
