//! Static schema documentation for the Kusama indexer GraphQL API.
//!
//! The corpus is an immutable table: [`SchemaCorpus::kusama`] builds the same
//! fragments every time, so retrieval depends only on (corpus, query).

use serde::{Deserialize, Serialize};

/// Metadata attached to a schema fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    /// type, query, filter, relationship, concept or example
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_types: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A stored schema documentation snippet used as retrieval context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFragment {
    pub id: String,
    pub content: String,
    pub metadata: FragmentMetadata,
}

impl SchemaFragment {
    /// Text that gets embedded: content enriched with examples and keywords
    /// so that queries phrased like an example or keyword land on the fragment.
    pub fn search_document(&self) -> String {
        let mut doc = self.content.clone();
        if !self.metadata.examples.is_empty() {
            doc.push_str(" Examples: ");
            doc.push_str(&self.metadata.examples.join(" "));
        }
        if !self.metadata.keywords.is_empty() {
            doc.push_str(" Keywords: ");
            doc.push_str(&self.metadata.keywords.join(" "));
        }
        doc
    }
}

/// Immutable table of schema fragments
#[derive(Debug, Clone)]
pub struct SchemaCorpus {
    fragments: Vec<SchemaFragment>,
}

impl SchemaCorpus {
    pub fn from_fragments(fragments: Vec<SchemaFragment>) -> Self {
        Self { fragments }
    }

    /// The hand-authored Kusama transfer indexer corpus
    pub fn kusama() -> Self {
        Self::from_fragments(kusama_fragments())
    }

    pub fn fragments(&self) -> &[SchemaFragment] {
        &self.fragments
    }

    pub fn get(&self, id: &str) -> Option<&SchemaFragment> {
        self.fragments.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

struct Entry<'a> {
    id: &'a str,
    category: &'a str,
    graphql_type: Option<&'a str>,
    related_types: &'a [&'a str],
    content: &'a str,
    examples: &'a [&'a str],
    keywords: &'a [&'a str],
}

impl Entry<'_> {
    fn build(&self) -> SchemaFragment {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SchemaFragment {
            id: self.id.to_string(),
            content: self.content.to_string(),
            metadata: FragmentMetadata {
                category: self.category.to_string(),
                graphql_type: self.graphql_type.map(String::from),
                related_types: owned(self.related_types),
                examples: owned(self.examples),
                keywords: owned(self.keywords),
            },
        }
    }
}

fn kusama_fragments() -> Vec<SchemaFragment> {
    KUSAMA_ENTRIES.iter().map(Entry::build).collect()
}

const KUSAMA_ENTRIES: &[Entry<'static>] = &[
    Entry {
        id: "type-account",
        category: "type",
        graphql_type: Some("Account"),
        related_types: &["Transfer"],
        content: "Account type represents a blockchain account or wallet address on Kusama. It has an 'id' field which is the account's unique address string (like 'CdwnRdmqJivB75M4advhMUdxMAaWgoRPhYQiwfSRigw18gc'). Accounts can have transfers going to them (transfersTo) and transfers coming from them (transfersFrom). Each account tracks all incoming and outgoing token movements.",
        examples: &[
            "accountById(id: \"CdwnRdmqJivB75M4advhMUdxMAaWgoRPhYQiwfSRigw18gc\")",
            "accounts { id transfersTo { amount } transfersFrom { amount } }",
        ],
        keywords: &["wallet", "address", "account", "balance"],
    },
    Entry {
        id: "type-transfer",
        category: "type",
        graphql_type: Some("Transfer"),
        related_types: &["Account"],
        content: "Transfer type represents a token transfer transaction between two accounts. Fields include: 'id' (unique identifier), 'blockNumber' (which block it occurred in), 'timestamp' (when it happened), 'extrinsicHash' (transaction hash, may be null for some transfers), 'from' (sender account), 'to' (recipient account), 'amount' (tokens transferred in smallest unit), and 'fee' (transaction fee paid, may be zero for old transfers).",
        examples: &[
            "transferById(id: \"0x123...\")",
            "transfers(where: { amount_gte: 1000000000000 }) { from { id } to { id } amount timestamp }",
        ],
        keywords: &["transaction", "transfer", "payment", "send", "receive"],
    },
    Entry {
        id: "query-account-by-id",
        category: "query",
        graphql_type: Some("Query.accountById"),
        related_types: &["Account"],
        content: "Query accountById(id: String!) returns a single Account by its exact address. Use this when you know the specific account address. The address must be a valid Kusama address string.",
        examples: &[
            "accountById(id: \"GcqKn3HHodwcFc3Pg3Evcbc43m7qJNMiMv744e5WMSS7TGn\") { id transfersTo { amount } }",
        ],
        keywords: &["single account", "specific address", "get account"],
    },
    Entry {
        id: "query-accounts-list",
        category: "query",
        graphql_type: Some("Query.accounts"),
        related_types: &["Account", "AccountWhereInput", "AccountOrderByInput"],
        content: "Query accounts returns a list of Account objects. Supports filtering with 'where' conditions, sorting with 'orderBy', pagination with 'limit' and 'offset'. Use this to search for multiple accounts or list all accounts.",
        examples: &[
            "accounts(limit: 10) { id }",
            "accounts(where: { transfersFrom_some: { amount_gte: 1000000000000 } }) { id }",
        ],
        keywords: &["list accounts", "multiple accounts", "all accounts"],
    },
    Entry {
        id: "query-transfer-by-id",
        category: "query",
        graphql_type: Some("Query.transferById"),
        related_types: &["Transfer"],
        content: "Query transferById(id: String!) returns a single Transfer by its unique identifier. Use this when you have a specific transfer ID.",
        examples: &[
            "transferById(id: \"0000000001-000001-c86bf\") { amount from { id } to { id } timestamp }",
        ],
        keywords: &["single transfer", "specific transaction"],
    },
    Entry {
        id: "query-transfers-list",
        category: "query",
        graphql_type: Some("Query.transfers"),
        related_types: &["Transfer", "TransferWhereInput", "TransferOrderByInput"],
        content: "Query transfers returns a list of Transfer objects. Supports filtering with 'where' for complex conditions, 'orderBy' for sorting (e.g., by timestamp or amount), 'limit' for pagination, and 'offset' for skipping results. This is the main query for finding transactions.",
        examples: &[
            "transfers(orderBy: timestamp_DESC, limit: 10) { amount from { id } to { id } timestamp }",
            "transfers(where: { blockNumber: 17581509 }) { id amount }",
            "transfers(where: { timestamp_gte: \"2024-01-01T00:00:00Z\" }) { amount }",
        ],
        keywords: &["list transfers", "transactions", "recent transfers", "transaction history"],
    },
    Entry {
        id: "filter-transfer-where",
        category: "filter",
        graphql_type: Some("TransferWhereInput"),
        related_types: &["Transfer"],
        content: "TransferWhereInput allows filtering transfers by: amount (amount_eq, amount_gte, amount_lte), blockNumber, timestamp (supports date comparisons), from/to accounts (can filter by nested Account properties), extrinsicHash. Use _gte for 'greater than or equal', _lte for 'less than or equal', _eq for exact match.",
        examples: &[
            "where: { amount_gte: 1000000000000 } // transfers >= 1 KSM",
            "where: { from: { id_eq: \"address\" } } // transfers from specific account",
            "where: { timestamp_gte: \"2024-01-01T00:00:00Z\", timestamp_lte: \"2024-01-31T23:59:59Z\" } // transfers in January 2024",
            "where: { blockNumber_eq: 17581509 } // transfers in specific block",
        ],
        keywords: &["filter", "where", "conditions", "search criteria"],
    },
    Entry {
        id: "filter-ordering",
        category: "filter",
        graphql_type: Some("OrderByInput"),
        related_types: &["TransferOrderByInput", "AccountOrderByInput"],
        content: "Ordering results: Use orderBy parameter with fields like timestamp_DESC (newest first), timestamp_ASC (oldest first), amount_DESC (largest first), amount_ASC (smallest first), blockNumber_DESC (recent blocks first). DESC means descending order, ASC means ascending order.",
        examples: &[
            "orderBy: timestamp_DESC // newest transfers first",
            "orderBy: amount_DESC // largest transfers first",
            "orderBy: blockNumber_ASC // oldest blocks first",
        ],
        keywords: &["sort", "order", "orderBy", "latest", "recent", "biggest", "smallest"],
    },
    Entry {
        id: "relationship-account-transfers",
        category: "relationship",
        graphql_type: Some("Account.transfersTo, Account.transfersFrom"),
        related_types: &["Account", "Transfer"],
        content: "Account to Transfer relationships: Each Account has 'transfersTo' (incoming transfers where this account is the recipient) and 'transfersFrom' (outgoing transfers where this account is the sender). These fields return arrays of Transfer objects and support the same filtering and ordering as the main transfers query.",
        examples: &[
            "account { transfersTo(orderBy: timestamp_DESC, limit: 5) { amount timestamp } }",
            "account { transfersFrom(where: { amount_gte: 1000000000000 }) { to { id } amount } }",
        ],
        keywords: &["incoming", "outgoing", "sent", "received", "account transfers"],
    },
    Entry {
        id: "relationship-transfer-accounts",
        category: "relationship",
        graphql_type: Some("Transfer.from, Transfer.to"),
        related_types: &["Transfer", "Account"],
        content: "Transfer to Account relationships: Each Transfer has 'from' (sender Account) and 'to' (recipient Account) fields. These return the complete Account object, allowing you to access the account's ID and navigate to their other transfers.",
        examples: &[
            "transfer { from { id } to { id } }",
            "transfer { from { transfersFrom(limit: 5) { amount } } } // sender's recent sends",
        ],
        keywords: &["sender", "recipient", "from account", "to account"],
    },
    Entry {
        id: "concept-kusama-basics",
        category: "concept",
        graphql_type: None,
        related_types: &[],
        content: "Kusama is Polkadot's canary network. KSM is the native token. Amounts are stored in the smallest unit (1 KSM = 1,000,000,000,000 units). Common addresses include validators like 'GcqKn3HHodwcFc3Pg3Evcbc43m7qJNMiMv744e5WMSS7TGn'. Block numbers increase over time. Timestamps are in ISO format (e.g., '2024-01-15T10:30:00Z').",
        examples: &[
            "1000000000000 units = 1 KSM",
            "Block 17581509 is a specific block height",
            "Timestamps like '2024-01-15T10:30:00Z' for January 15, 2024",
        ],
        keywords: &["KSM", "kusama", "units", "denomination", "planck"],
    },
    Entry {
        id: "concept-pagination",
        category: "concept",
        graphql_type: None,
        related_types: &[],
        content: "Pagination: Use 'limit' to restrict number of results (e.g., limit: 10 for top 10), 'offset' to skip results (e.g., offset: 20 to skip first 20). Combine with orderBy for consistent pagination. Maximum limit depends on query complexity.",
        examples: &[
            "transfers(limit: 10, offset: 0) // first page",
            "transfers(limit: 10, offset: 10) // second page",
            "transfers(orderBy: timestamp_DESC, limit: 5) // latest 5 transfers",
        ],
        keywords: &["pagination", "limit", "offset", "page", "results per page"],
    },
    Entry {
        id: "example-last-transaction",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To find the last/latest transaction for an address: Query the account by ID, then get transfersFrom or transfersTo ordered by timestamp_DESC with limit 1. This pattern works for finding the most recent activity.",
        examples: &[
            "accountById(id: \"CdwnRdmqJivB75M4advhMUdxMAaWgoRPhYQiwfSRigw18gc\") { transfersFrom(orderBy: timestamp_DESC, limit: 1) { id amount to { id } timestamp blockNumber } }",
        ],
        keywords: &["last transaction", "latest transaction", "most recent"],
    },
    Entry {
        id: "example-recent-transfers",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To find transfers in the last hour or specific time period: Use timestamp filtering with _gte (greater than or equal) for start time and _lte (less than or equal) for end time. Calculate the timestamp for 'one hour ago' from current time.",
        examples: &[
            "transfers(where: { timestamp_gte: \"2024-01-15T09:00:00Z\", timestamp_lte: \"2024-01-15T10:00:00Z\" }, orderBy: timestamp_DESC) { id amount from { id } to { id } timestamp }",
        ],
        keywords: &["last hour", "recent", "time period", "today", "this week"],
    },
    Entry {
        id: "example-block-transfers",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To find what happened in a specific block: Query transfers with blockNumber_eq filter. Each block can contain multiple transfers. Block numbers are integers that increase with each new block.",
        examples: &[
            "transfers(where: { blockNumber_eq: 17581509 }) { id amount from { id } to { id } extrinsicHash timestamp }",
        ],
        keywords: &["specific block", "block number", "block transfers", "block transactions"],
    },
    Entry {
        id: "example-large-transfers",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To find large transfers or whale movements: Use amount_gte filter with large values. Remember amounts are in smallest units (1 KSM = 1e12 units). Combine with orderBy: amount_DESC to see biggest first.",
        examples: &[
            "transfers(where: { amount_gte: \"1000000000000000\" }, orderBy: amount_DESC, limit: 10) { amount from { id } to { id } timestamp } // >= 1000 KSM",
        ],
        keywords: &["large transfers", "whale", "big transactions", "high value"],
    },
    Entry {
        id: "example-account-activity",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To get all activity for an account: Query account by ID and fetch both transfersTo (received) and transfersFrom (sent). You can filter and order these separately to analyze account behavior.",
        examples: &[
            "accountById(id: \"address\") { transfersTo(orderBy: timestamp_DESC, limit: 10) { amount from { id } timestamp } transfersFrom(orderBy: timestamp_DESC, limit: 10) { amount to { id } timestamp } }",
        ],
        keywords: &["account activity", "account history", "all transfers", "account analysis"],
    },
    Entry {
        id: "example-transfer-between-accounts",
        category: "example",
        graphql_type: None,
        related_types: &[],
        content: "To find transfers between two specific accounts: Use compound where conditions with both from and to account filters. This helps track payments or interactions between specific addresses.",
        examples: &[
            "transfers(where: { from: { id_eq: \"sender_address\" }, to: { id_eq: \"recipient_address\" } }) { amount timestamp blockNumber }",
        ],
        keywords: &["between accounts", "from to", "specific sender receiver", "payment tracking"],
    },
];
