//! Staging store schema definitions
//!
//! Table and column names used with rusqlite, plus the ordered column lists
//! that drive both ingestion and emission. Column order here is the output
//! attribute order.

/// How a column behaves when the source attribute is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Always present; the store refuses a row without it
    Required,
    /// Omitted from the output element when absent
    Optional,
    /// Emitted as the literal `null` when absent
    NullToken,
}

/// A single staged attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name, identical to the XML attribute name
    pub name: &'static str,
    /// Absent-value rule
    pub presence: Presence,
}

impl Column {
    const fn required(name: &'static str) -> Self {
        Self { name, presence: Presence::Required }
    }

    const fn optional(name: &'static str) -> Self {
        Self { name, presence: Presence::Optional }
    }

    const fn null_token(name: &'static str) -> Self {
        Self { name, presence: Presence::NullToken }
    }
}

/// Descriptor for one staging relation.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    /// Table name
    pub name: &'static str,
    /// Integer column that precedes the attribute columns, if any
    pub key_column: Option<&'static str>,
    /// Attribute columns in output order
    pub columns: &'static [Column],
}

impl Table {
    /// Position of an attribute column
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// `INSERT` statement covering the key column (when present) and every
    /// attribute column, with positional placeholders.
    #[must_use]
    pub fn insert_sql(&self) -> String {
        let mut names: Vec<String> = Vec::with_capacity(self.columns.len() + 1);
        if let Some(key) = self.key_column {
            names.push(format!("\"{key}\""));
        }
        names.extend(self.columns.iter().map(|column| format!("\"{}\"", column.name)));
        let placeholders = vec!["?"; names.len()].join(", ");
        format!("INSERT INTO {} ({}) VALUES ({})", self.name, names.join(", "), placeholders)
    }

    /// Quoted attribute column list for `SELECT`
    #[must_use]
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("\"{}\"", column.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// SMS table schema
pub mod smss {
    use super::{Column, Table};

    /// Table name
    pub const TABLE: &str = "smss";
    /// Counterparty phone number column
    pub const ADDRESS: &str = "address";
    /// Message type column (1 received, 2 sent)
    pub const TYPE: &str = "type";
    /// Sent timestamp column, used for ordering
    pub const DATE_SENT: &str = "date_sent";
    /// Human-readable date column
    pub const READABLE_DATE: &str = "readable_date";
    /// Export attributes that are never staged
    pub const DROPPED: &[&str] = &["sub_id"];

    /// Ordered column set
    pub static SCHEMA: Table = Table {
        name: TABLE,
        key_column: None,
        columns: &[
            Column::required("protocol"),
            Column::required(ADDRESS),
            Column::required("date"),
            Column::required(TYPE),
            Column::required("subject"),
            Column::required("body"),
            Column::required("toa"),
            Column::required("sc_toa"),
            Column::required("service_center"),
            Column::required("read"),
            Column::required("status"),
            Column::required("locked"),
            Column::required(DATE_SENT),
            Column::required(READABLE_DATE),
            Column::required("contact_name"),
        ],
    };
}

/// MMS table schema
pub mod mmss {
    use super::{Column, Table};

    /// Table name
    pub const TABLE: &str = "mmss";
    /// Synthetic primary key column
    pub const ID: &str = "id";
    /// Message timestamp column
    pub const DATE: &str = "date";
    /// Sent timestamp column, used for ordering
    pub const DATE_SENT: &str = "date_sent";
    /// Human-readable date column
    pub const READABLE_DATE: &str = "readable_date";
    /// Conversation ordering hint, cross-checked against `date` then dropped
    pub const SEQUENCE_TIME: &str = "sequence_time";
    /// Row id from the exporting device, replaced by the synthetic id
    pub const SOURCE_ID: &str = "_id";
    /// Starred flag written by some exporters, dropped
    pub const STAR_STATUS: &str = "star_status";
    /// Vendor extension attributes, dropped
    pub const VENDOR_EXTENSION_PATTERN: &str = r"^oppo_[a-z_]+$";

    /// Ordered column set
    pub static SCHEMA: Table = Table {
        name: TABLE,
        key_column: Some(ID),
        columns: &[
            Column::required("text_only"),
            Column::required("ct_t"),
            Column::optional("using_mode"),
            Column::required("msg_box"),
            Column::optional("secret_mode"),
            Column::required("v"),
            Column::required("retr_txt_cs"),
            Column::required("ct_cls"),
            Column::optional("favorite"),
            Column::optional("d_rpt_st"),
            Column::optional("deletable"),
            Column::required("st"),
            Column::optional("sim_imsi"),
            Column::optional("creator"),
            Column::required("tr_id"),
            Column::optional("sim_slot"),
            Column::required("read"),
            Column::required("m_id"),
            Column::optional("callback_set"),
            Column::required("m_type"),
            Column::required("retr_txt"),
            Column::required("locked"),
            Column::required("resp_txt"),
            Column::optional("rr_st"),
            Column::optional("safe_message"),
            Column::required("retr_st"),
            Column::optional("reserved"),
            Column::optional("msg_id"),
            Column::optional("hidden"),
            Column::required("sub"),
            Column::required("rr"),
            Column::required("seen"),
            Column::required("ct_l"),
            Column::optional("from_address"),
            Column::required("m_size"),
            Column::required("exp"),
            Column::required("sub_cs"),
            Column::required("sub_id"),
            Column::required("resp_st"),
            Column::required(DATE),
            Column::optional("app_id"),
            Column::required(DATE_SENT),
            Column::required("pri"),
            Column::required("address"),
            Column::required("read_status"),
            Column::required("d_tm"),
            Column::required("d_rpt"),
            Column::optional("device_name"),
            Column::optional("spam_report"),
            Column::required("rpt_a"),
            Column::required("m_cls"),
            Column::required(READABLE_DATE),
            Column::required("contact_name"),
            Column::optional("network_type"),
            Column::optional("privacy_mode"),
        ],
    };
}

/// MMS parts table schema
pub mod parts {
    use super::{Column, Table};

    /// Table name
    pub const TABLE: &str = "parts";
    /// Foreign key to `mmss.id`
    pub const FK_ID_MMS: &str = "fk_id_mms";

    /// Ordered column set
    pub static SCHEMA: Table = Table {
        name: TABLE,
        key_column: Some(FK_ID_MMS),
        columns: &[
            Column::required("seq"),
            Column::required("ct"),
            Column::required("name"),
            Column::required("chset"),
            Column::required("cd"),
            Column::required("fn"),
            Column::required("cid"),
            Column::required("cl"),
            Column::required("ctt_s"),
            Column::required("ctt_t"),
            Column::null_token("text"),
            Column::null_token("data"),
        ],
    };
}

/// MMS addresses table schema
pub mod addrs {
    use super::{Column, Table};

    /// Table name
    pub const TABLE: &str = "addrs";
    /// Foreign key to `mmss.id`
    pub const FK_ID_MMS: &str = "fk_id_mms";
    /// Participant address column
    pub const ADDRESS: &str = "address";
    /// PDU direction code column (137 from, 151 to, 130 cc)
    pub const TYPE: &str = "type";

    /// Ordered column set
    pub static SCHEMA: Table = Table {
        name: TABLE,
        key_column: Some(FK_ID_MMS),
        columns: &[Column::required(ADDRESS), Column::required(TYPE), Column::required("charset")],
    };
}
