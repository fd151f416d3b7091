//! Static entity registry: one table per entity, fields in column order.
//! The first field of every entity is its primary key.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Agent,
    Company,
    Customer,
    Order,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Agent,
        EntityKind::Company,
        EntityKind::Customer,
        EntityKind::Order,
    ];

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityKind::Agent => &AGENTS,
            EntityKind::Company => &COMPANY,
            EntityKind::Customer => &CUSTOMER,
            EntityKind::Order => &ORDERS,
        }
    }

    /// Resolve the URL path segment (`agents`, `company`, ...) to its entity.
    pub fn from_path(segment: &str) -> Option<EntityKind> {
        Self::ALL.into_iter().find(|k| k.schema().path_segment == segment)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema().label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Date,
}

impl FieldKind {
    /// Column type used when creating the table.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldKind::String => "TEXT",
            FieldKind::Integer => "BIGINT",
            FieldKind::Float => "DOUBLE PRECISION",
            FieldKind::Date => "DATE",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, required: bool, description: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        required,
        description,
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: &'static str,
    pub path_segment: &'static str,
    /// Singular name used in response messages ("Agent added").
    pub label: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl EntitySchema {
    pub fn key(&self) -> &'static FieldDescriptor {
        let fields: &'static [FieldDescriptor] = self.fields;
        &fields[0]
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        let fields: &'static [FieldDescriptor] = self.fields;
        fields.iter().find(|f| f.name == name)
    }

    /// Every field except the primary key, in column order.
    pub fn mutable_fields(&self) -> &'static [FieldDescriptor] {
        let fields: &'static [FieldDescriptor] = self.fields;
        &fields[1..]
    }

    pub fn is_key(&self, field: &FieldDescriptor) -> bool {
        self.key().name == field.name
    }
}

use FieldKind::{Date, Float, Integer, String as Text};

static AGENTS: EntitySchema = EntitySchema {
    kind: EntityKind::Agent,
    table: "agents",
    path_segment: "agents",
    label: "Agent",
    fields: &[
        field("AGENT_CODE", Text, true, "The agent's code"),
        field("AGENT_NAME", Text, true, "The agent's name"),
        field("WORKING_AREA", Text, false, "The area where the agent works"),
        field("COMMISSION", Float, false, "The agent's commission rate"),
        field("PHONE_NO", Text, false, "The agent's phone number"),
        field("COUNTRY", Text, false, "The agent's country"),
    ],
};

static COMPANY: EntitySchema = EntitySchema {
    kind: EntityKind::Company,
    table: "company",
    path_segment: "company",
    label: "Company",
    fields: &[
        field("COMPANY_ID", Text, true, "The company's id"),
        field("COMPANY_NAME", Text, true, "The company's name"),
        field("COMPANY_CITY", Text, false, "The city the company is based in"),
    ],
};

static CUSTOMER: EntitySchema = EntitySchema {
    kind: EntityKind::Customer,
    table: "customer",
    path_segment: "customer",
    label: "Customer",
    fields: &[
        field("CUST_CODE", Text, true, "The customer's code"),
        field("CUST_NAME", Text, true, "The customer's name"),
        field("CUST_CITY", Text, false, "The customer's city"),
        field("WORKING_AREA", Text, false, "The customer's working area"),
        field("CUST_COUNTRY", Text, false, "The customer's country"),
        field("GRADE", Integer, false, "The customer's grade"),
        field("OPENING_AMT", Float, false, "Opening amount"),
        field("RECEIVE_AMT", Float, false, "Received amount"),
        field("PAYMENT_AMT", Float, false, "Payment amount"),
        field("OUTSTANDING_AMT", Float, false, "Outstanding amount"),
        field("PHONE_NO", Text, false, "The customer's phone number"),
        field("AGENT_CODE", Text, false, "Code of the agent serving the customer"),
    ],
};

static ORDERS: EntitySchema = EntitySchema {
    kind: EntityKind::Order,
    table: "orders",
    path_segment: "orders",
    label: "Order",
    fields: &[
        field("ORD_NUM", Text, true, "The order number"),
        field("ORD_AMOUNT", Float, false, "The order amount"),
        field("ADVANCE_AMOUNT", Float, false, "Amount paid in advance"),
        field("ORD_DATE", Date, false, "The order date (YYYY-MM-DD)"),
        field("CUST_CODE", Text, false, "Code of the ordering customer"),
        field("AGENT_CODE", Text, false, "Code of the agent handling the order"),
        field("ORD_DESCRIPTION", Text, false, "Free-form order description"),
    ],
};
