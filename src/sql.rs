use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlparser::ast::{
    self, AssignmentTarget, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor,
    TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::engine::{NewPayment, NewReservation, ReservationPatch, RoomRequest};
use crate::model::*;

/// Parsed command from SQL input. Inserts take positional VALUES; the
/// column list, when present, is ignored (ids are always client-supplied
/// ULIDs). Reservation room assignments travel as a JSON array value.
#[derive(Debug)]
pub enum Command {
    InsertFloor {
        id: Ulid,
        name: String,
    },
    InsertRoomType {
        id: Ulid,
        code: String,
        name: String,
        capacity: u32,
        base_price: Decimal,
    },
    UpdateRoomType {
        id: Ulid,
        name: Option<String>,
        capacity: Option<u32>,
        base_price: Option<Decimal>,
    },
    InsertRoom {
        id: Ulid,
        number: String,
        floor_id: Ulid,
        room_type_id: Ulid,
        status: RoomStatus,
        notes: Option<String>,
    },
    UpdateRoom {
        id: Ulid,
        status: Option<RoomStatus>,
        notes: Option<Option<String>>,
    },
    DeleteRoom {
        id: Ulid,
    },
    InsertCustomer {
        id: Ulid,
        name: String,
        phone: Option<String>,
        national_id: Option<String>,
        address: Option<String>,
    },
    UpdateCustomer {
        id: Ulid,
        name: Option<String>,
        phone: Option<Option<String>>,
        national_id: Option<Option<String>>,
        address: Option<Option<String>>,
    },
    InsertReservation {
        reservation: NewReservation,
    },
    /// `UPDATE reservations SET status = '…' WHERE id = '…'` — a lifecycle
    /// transition, guarded by the state machine.
    UpdateReservationStatus {
        id: Ulid,
        status: ReservationStatus,
    },
    /// Field/room updates; re-runs the availability check when dates or
    /// rooms change.
    UpdateReservationFields {
        id: Ulid,
        patch: ReservationPatch,
    },
    DeleteReservation {
        id: Ulid,
    },
    InsertPayment {
        payment: NewPayment,
    },
    UpdateCleaningTask {
        id: Ulid,
        status: CleaningStatus,
    },
    SelectFloors,
    SelectRoomTypes,
    SelectRooms,
    SelectReservations {
        id: Option<Ulid>,
        customer_id: Option<Ulid>,
    },
    SelectPayments {
        customer_id: Option<Ulid>,
    },
    SelectCleaningTasks {
        status: Option<CleaningStatus>,
    },
    SelectAvailability {
        check_in: NaiveDate,
        check_out: NaiveDate,
        room_type_id: Option<Ulid>,
        guest_count: Option<u32>,
    },
    SelectFreeWindows {
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    SelectLedger {
        customer_id: Ulid,
    },
    SelectBalance {
        customer_id: Ulid,
    },
    Listen {
        channel: String,
    },
}

/// Shape of one element of the reservation `rooms` JSON array.
#[derive(Debug, Deserialize)]
struct RoomSpec {
    room_id: String,
    check_in_date: Option<NaiveDate>,
    check_out_date: Option<NaiveDate>,
    rate: Option<Decimal>,
    currency: Option<String>,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim();
    if trimmed.to_uppercase().starts_with("LISTEN ") {
        let channel = trimmed[7..].trim().trim_matches(';').to_string();
        return Ok(Command::Listen { channel });
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "floors" => {
            if values.len() < 2 {
                return Err(SqlError::WrongArity("floors", 2, values.len()));
            }
            Ok(Command::InsertFloor {
                id: parse_ulid(&values[0])?,
                name: parse_string(&values[1])?,
            })
        }
        "room_types" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("room_types", 5, values.len()));
            }
            Ok(Command::InsertRoomType {
                id: parse_ulid(&values[0])?,
                code: parse_string(&values[1])?,
                name: parse_string(&values[2])?,
                capacity: parse_u32(&values[3])?,
                base_price: parse_decimal(&values[4])?,
            })
        }
        "rooms" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("rooms", 4, values.len()));
            }
            let status = if values.len() >= 5 {
                parse_room_status(&values[4])?
            } else {
                RoomStatus::Available
            };
            let notes = if values.len() >= 6 {
                parse_string_or_null(&values[5])?
            } else {
                None
            };
            Ok(Command::InsertRoom {
                id: parse_ulid(&values[0])?,
                number: parse_string(&values[1])?,
                floor_id: parse_ulid(&values[2])?,
                room_type_id: parse_ulid(&values[3])?,
                status,
                notes,
            })
        }
        "customers" => {
            if values.len() < 2 {
                return Err(SqlError::WrongArity("customers", 2, values.len()));
            }
            let opt = |i: usize| -> Result<Option<String>, SqlError> {
                if values.len() > i {
                    parse_string_or_null(&values[i])
                } else {
                    Ok(None)
                }
            };
            Ok(Command::InsertCustomer {
                id: parse_ulid(&values[0])?,
                name: parse_string(&values[1])?,
                phone: opt(2)?,
                national_id: opt(3)?,
                address: opt(4)?,
            })
        }
        "reservations" => {
            // (id, customer_id, check_in_date, check_out_date, guest_count,
            //  rooms_json[, notes[, status]])
            if values.len() < 6 {
                return Err(SqlError::WrongArity("reservations", 6, values.len()));
            }
            let rooms = parse_rooms_json(&parse_string(&values[5])?)?;
            let notes = if values.len() >= 7 {
                parse_string_or_null(&values[6])?
            } else {
                None
            };
            let status = if values.len() >= 8 {
                Some(parse_reservation_status(&values[7])?)
            } else {
                None
            };
            Ok(Command::InsertReservation {
                reservation: NewReservation {
                    id: parse_ulid(&values[0])?,
                    customer_id: parse_ulid(&values[1])?,
                    stay: Stay {
                        check_in: parse_date(&values[2])?,
                        check_out: parse_date(&values[3])?,
                    },
                    guest_count: parse_u32(&values[4])?,
                    status,
                    notes,
                    rooms,
                },
            })
        }
        "payments" => {
            // (id, customer_id, method, amount[, reservation_id[, currency
            //  [, reference[, notes[, status]]]]])
            if values.len() < 4 {
                return Err(SqlError::WrongArity("payments", 4, values.len()));
            }
            let reservation_id = if values.len() >= 5 {
                parse_ulid_or_null(&values[4])?
            } else {
                None
            };
            let currency = if values.len() >= 6 {
                parse_string_or_null(&values[5])?
            } else {
                None
            };
            let reference = if values.len() >= 7 {
                parse_string_or_null(&values[6])?
            } else {
                None
            };
            let notes = if values.len() >= 8 {
                parse_string_or_null(&values[7])?
            } else {
                None
            };
            let status = if values.len() >= 9 {
                Some(parse_payment_status(&values[8])?)
            } else {
                None
            };
            Ok(Command::InsertPayment {
                payment: NewPayment {
                    id: parse_ulid(&values[0])?,
                    customer_id: parse_ulid(&values[1])?,
                    reservation_id,
                    method: parse_payment_method(&values[2])?,
                    amount: parse_decimal(&values[3])?,
                    currency,
                    status,
                    reference,
                    notes,
                },
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let id = extract_where_id(&delete.selection)?;

    match table.as_str() {
        "rooms" => Ok(Command::DeleteRoom { id }),
        "reservations" => Ok(Command::DeleteReservation { id }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    let id = extract_where_id(selection)?;

    let mut fields: Vec<(String, &Expr)> = Vec::new();
    for a in assignments {
        let col = match &a.target {
            AssignmentTarget::ColumnName(name) => object_name_last(name)
                .ok_or_else(|| SqlError::Parse("empty column name in SET".into()))?,
            _ => return Err(SqlError::Unsupported("tuple assignment".into())),
        };
        fields.push((col, &a.value));
    }

    match table.as_str() {
        "reservations" => {
            let has_status = fields.iter().any(|(c, _)| c == "status");
            if has_status {
                if fields.len() != 1 {
                    return Err(SqlError::Unsupported(
                        "status cannot be combined with other fields".into(),
                    ));
                }
                let status = parse_reservation_status(fields[0].1)?;
                return Ok(Command::UpdateReservationStatus { id, status });
            }
            let mut patch = ReservationPatch::default();
            let mut check_in: Option<NaiveDate> = None;
            let mut check_out: Option<NaiveDate> = None;
            for (col, value) in &fields {
                match col.as_str() {
                    "check_in_date" => check_in = Some(parse_date(value)?),
                    "check_out_date" => check_out = Some(parse_date(value)?),
                    "guest_count" => patch.guest_count = Some(parse_u32(value)?),
                    "notes" => patch.notes = Some(parse_string_or_null(value)?),
                    "rooms" => {
                        patch.rooms = Some(parse_rooms_json(&parse_string(value)?)?);
                    }
                    other => return Err(SqlError::UnknownColumn(other.to_string())),
                }
            }
            match (check_in, check_out) {
                (None, None) => {}
                (Some(ci), Some(co)) => patch.stay = Some(Stay { check_in: ci, check_out: co }),
                _ => {
                    return Err(SqlError::Parse(
                        "check_in_date and check_out_date must be updated together".into(),
                    ));
                }
            }
            Ok(Command::UpdateReservationFields { id, patch })
        }
        "rooms" => {
            let mut status = None;
            let mut notes = None;
            for (col, value) in &fields {
                match col.as_str() {
                    "status" => status = Some(parse_room_status(value)?),
                    "notes" => notes = Some(parse_string_or_null(value)?),
                    other => return Err(SqlError::UnknownColumn(other.to_string())),
                }
            }
            Ok(Command::UpdateRoom { id, status, notes })
        }
        "room_types" => {
            let mut name = None;
            let mut capacity = None;
            let mut base_price = None;
            for (col, value) in &fields {
                match col.as_str() {
                    "name" => name = Some(parse_string(value)?),
                    "capacity" => capacity = Some(parse_u32(value)?),
                    "base_price" => base_price = Some(parse_decimal(value)?),
                    other => return Err(SqlError::UnknownColumn(other.to_string())),
                }
            }
            Ok(Command::UpdateRoomType { id, name, capacity, base_price })
        }
        "customers" => {
            let mut name = None;
            let mut phone = None;
            let mut national_id = None;
            let mut address = None;
            for (col, value) in &fields {
                match col.as_str() {
                    "name" => name = Some(parse_string(value)?),
                    "phone" => phone = Some(parse_string_or_null(value)?),
                    "national_id" => national_id = Some(parse_string_or_null(value)?),
                    "address" => address = Some(parse_string_or_null(value)?),
                    other => return Err(SqlError::UnknownColumn(other.to_string())),
                }
            }
            Ok(Command::UpdateCustomer { id, name, phone, national_id, address })
        }
        "cleaning_tasks" => {
            if fields.len() != 1 || fields[0].0 != "status" {
                return Err(SqlError::Unsupported(
                    "cleaning_tasks update supports only status".into(),
                ));
            }
            let status = parse_cleaning_status(fields[0].1)?;
            Ok(Command::UpdateCleaningTask { id, status })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters: Vec<(String, &Expr)> = Vec::new();
    if let Some(selection) = &select.selection {
        collect_eq_filters(selection, &mut filters)?;
    }
    let find = |col: &str| filters.iter().find(|(c, _)| c == col).map(|(_, e)| *e);

    match table.as_str() {
        "floors" => Ok(Command::SelectFloors),
        "room_types" => Ok(Command::SelectRoomTypes),
        "rooms" => Ok(Command::SelectRooms),
        "reservations" => Ok(Command::SelectReservations {
            id: find("id").map(parse_ulid).transpose()?,
            customer_id: find("customer_id").map(parse_ulid).transpose()?,
        }),
        "payments" => Ok(Command::SelectPayments {
            customer_id: find("customer_id").map(parse_ulid).transpose()?,
        }),
        "cleaning_tasks" => Ok(Command::SelectCleaningTasks {
            status: find("status").map(parse_cleaning_status).transpose()?,
        }),
        "availability" => Ok(Command::SelectAvailability {
            check_in: find("check_in_date")
                .map(parse_date)
                .transpose()?
                .ok_or(SqlError::MissingFilter("check_in_date"))?,
            check_out: find("check_out_date")
                .map(parse_date)
                .transpose()?
                .ok_or(SqlError::MissingFilter("check_out_date"))?,
            room_type_id: find("room_type_id").map(parse_ulid).transpose()?,
            guest_count: find("guest_count").map(parse_u32).transpose()?,
        }),
        "free_windows" => Ok(Command::SelectFreeWindows {
            room_id: find("room_id")
                .map(parse_ulid)
                .transpose()?
                .ok_or(SqlError::MissingFilter("room_id"))?,
            check_in: find("check_in_date")
                .map(parse_date)
                .transpose()?
                .ok_or(SqlError::MissingFilter("check_in_date"))?,
            check_out: find("check_out_date")
                .map(parse_date)
                .transpose()?
                .ok_or(SqlError::MissingFilter("check_out_date"))?,
        }),
        "ledger" => Ok(Command::SelectLedger {
            customer_id: find("customer_id")
                .map(parse_ulid)
                .transpose()?
                .ok_or(SqlError::MissingFilter("customer_id"))?,
        }),
        "balance" => Ok(Command::SelectBalance {
            customer_id: find("customer_id")
                .map(parse_ulid)
                .transpose()?
                .ok_or(SqlError::MissingFilter("customer_id"))?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Walk AND-joined equality predicates; anything else is unsupported.
fn collect_eq_filters<'a>(
    expr: &'a Expr,
    out: &mut Vec<(String, &'a Expr)>,
) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                collect_eq_filters(left, out)?;
                collect_eq_filters(right, out)?;
                Ok(())
            }
            ast::BinaryOperator::Eq => {
                if let Some(col) = expr_column_name(left) {
                    out.push((col, right));
                }
                Ok(())
            }
            _ => Err(SqlError::Unsupported("only = and AND filters".into())),
        },
        Expr::Nested(inner) => collect_eq_filters(inner, out),
        _ => Err(SqlError::Unsupported("unsupported WHERE clause".into())),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            if values.rows.len() > 1 {
                return Err(SqlError::Unsupported("multi-row INSERT".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_ulid_or_null(expr: &Expr) -> Result<Option<Ulid>, SqlError> {
    if let Some(Value::Null) = extract_value(expr) {
        return Ok(None);
    }
    parse_ulid(expr).map(Some)
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            Value::Number(s, _) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    if let Some(Value::Null) = extract_value(expr) {
        return Ok(None);
    }
    parse_string(expr).map(Some)
}

fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let s = parse_string(expr)?;
    s.parse()
        .map_err(|e| SqlError::Parse(format!("bad date {s:?}: {e}")))
}

fn parse_decimal(expr: &Expr) -> Result<Decimal, SqlError> {
    let s = parse_string(expr)?;
    Decimal::from_str(&s).map_err(|e| SqlError::Parse(format!("bad decimal {s:?}: {e}")))
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let s = parse_string(expr)?;
    s.parse()
        .map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}")))
}

fn parse_room_status(expr: &Expr) -> Result<RoomStatus, SqlError> {
    let s = parse_string(expr)?;
    RoomStatus::parse(&s).ok_or_else(|| SqlError::Parse(format!("unknown room status {s:?}")))
}

fn parse_reservation_status(expr: &Expr) -> Result<ReservationStatus, SqlError> {
    let s = parse_string(expr)?;
    ReservationStatus::parse(&s)
        .ok_or_else(|| SqlError::Parse(format!("unknown reservation status {s:?}")))
}

fn parse_payment_status(expr: &Expr) -> Result<PaymentStatus, SqlError> {
    let s = parse_string(expr)?;
    PaymentStatus::parse(&s)
        .ok_or_else(|| SqlError::Parse(format!("unknown payment status {s:?}")))
}

fn parse_payment_method(expr: &Expr) -> Result<PaymentMethod, SqlError> {
    let s = parse_string(expr)?;
    PaymentMethod::parse(&s)
        .ok_or_else(|| SqlError::Parse(format!("unknown payment method {s:?}")))
}

fn parse_cleaning_status(expr: &Expr) -> Result<CleaningStatus, SqlError> {
    let s = parse_string(expr)?;
    CleaningStatus::parse(&s)
        .ok_or_else(|| SqlError::Parse(format!("unknown cleaning status {s:?}")))
}

fn parse_rooms_json(json: &str) -> Result<Vec<RoomRequest>, SqlError> {
    let specs: Vec<RoomSpec> =
        serde_json::from_str(json).map_err(|e| SqlError::Parse(format!("bad rooms JSON: {e}")))?;
    let mut rooms = Vec::with_capacity(specs.len());
    for spec in specs {
        let room_id = Ulid::from_string(&spec.room_id)
            .map_err(|e| SqlError::Parse(format!("bad room_id in rooms JSON: {e}")))?;
        let stay = match (spec.check_in_date, spec.check_out_date) {
            (Some(check_in), Some(check_out)) => Some(Stay { check_in, check_out }),
            (None, None) => None,
            _ => {
                return Err(SqlError::Parse(
                    "room stay override needs both check_in_date and check_out_date".into(),
                ));
            }
        };
        rooms.push(RoomRequest {
            room_id,
            stay,
            rate: spec.rate,
            currency: spec.currency,
        });
    }
    Ok(rooms)
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
