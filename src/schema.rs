//! Database schema definitions
//!
//! Table and column names for both sides of the migration. The source side is
//! the Android `msgstore.db` layout; the destination side is the Core Data
//! backed `ChatStorage.sqlite` layout used on iOS.

/// Source message table (Android)
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Source-assigned row id
    pub const ID: &str = "_id";
    /// Remote party address (contact or group JID)
    pub const KEY_REMOTE_JID: &str = "key_remote_jid";
    /// Outbound flag
    pub const KEY_FROM_ME: &str = "key_from_me";
    /// Message body
    pub const DATA: &str = "data";
    /// Milliseconds since 1970-01-01
    pub const TIMESTAMP: &str = "timestamp";
    /// Delivery/read status code
    pub const STATUS: &str = "status";
    /// Media type code (0 = plain text)
    pub const MEDIA_WA_TYPE: &str = "media_wa_type";
    /// Starred flag
    pub const STARRED: &str = "starred";
}

/// Source chat table (Android)
pub mod chat {
    /// Table name
    pub const TABLE: &str = "chat";
}

/// Tables whose presence marks the modern Android schema.
pub const MODERN_MARKER_TABLES: [&str; 4] = [
    "message_quoted",
    "message_ephemeral",
    "message_poll",
    "message_view_once",
];

/// Tables every recognised Android schema carries.
pub const BASELINE_TABLES: [&str; 2] = [messages::TABLE, chat::TABLE];

/// Destination message table (iOS)
pub mod zwamessage {
    /// Table name
    pub const TABLE: &str = "ZWAMESSAGE";
    /// Sequential primary key
    pub const Z_PK: &str = "Z_PK";
    /// Core Data entity id
    pub const Z_ENT: &str = "Z_ENT";
    /// Core Data optimistic-locking version
    pub const Z_OPT: &str = "Z_OPT";
    /// Outbound flag
    pub const ZISFROMME: &str = "ZISFROMME";
    /// Status code (0-5)
    pub const ZMESSAGESTATUS: &str = "ZMESSAGESTATUS";
    /// Message type code
    pub const ZMESSAGETYPE: &str = "ZMESSAGETYPE";
    /// Starred flag
    pub const ZSTARRED: &str = "ZSTARRED";
    /// Message body
    pub const ZTEXT: &str = "ZTEXT";
    /// Message date, seconds since 2001-01-01
    pub const ZMESSAGEDATE: &str = "ZMESSAGEDATE";
    /// Sent date, seconds since 2001-01-01
    pub const ZSENTDATE: &str = "ZSENTDATE";
    /// Received date, seconds since 2001-01-01
    pub const ZRECEIVEDDATE: &str = "ZRECEIVEDDATE";
    /// Sender address
    pub const ZFROMJID: &str = "ZFROMJID";
    /// Recipient address
    pub const ZTOJID: &str = "ZTOJID";
    /// Group event discriminator, 0 for ordinary messages
    pub const ZGROUPEVENTTYPE: &str = "ZGROUPEVENTTYPE";

    /// Columns the migrator writes; all must exist in the working copy.
    pub const REQUIRED_COLUMNS: [&str; 14] = [
        Z_PK,
        Z_ENT,
        Z_OPT,
        ZISFROMME,
        ZMESSAGESTATUS,
        ZMESSAGETYPE,
        ZSTARRED,
        ZTEXT,
        ZMESSAGEDATE,
        ZSENTDATE,
        ZRECEIVEDDATE,
        ZFROMJID,
        ZTOJID,
        ZGROUPEVENTTYPE,
    ];
}

/// Core Data key bookkeeping table (iOS)
pub mod z_primarykey {
    /// Table name
    pub const TABLE: &str = "Z_PRIMARYKEY";
    /// Entity id
    pub const Z_ENT: &str = "Z_ENT";
    /// Entity name
    pub const Z_NAME: &str = "Z_NAME";
    /// Highest key issued for the entity
    pub const Z_MAX: &str = "Z_MAX";
    /// Entity name of message rows
    pub const MESSAGE_ENTITY: &str = "WAMessage";
}

/// Prefix of SQLite's own bookkeeping tables.
pub const SQLITE_INTERNAL_PREFIX: &str = "sqlite_";

/// Prefix of Core Data's bookkeeping tables in the destination.
pub const CORE_DATA_INTERNAL_PREFIX: &str = "Z_";
