use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;
use ulid::Ulid;

use crate::auth::FrontDeskAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::sql::{self, Command};

pub struct FrontDeskHandler {
    engine: Arc<Engine>,
    query_parser: Arc<FrontDeskQueryParser>,
}

impl FrontDeskHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(FrontDeskQueryParser),
        }
    }

    async fn run_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = crate::observability::command_label(&cmd);
        let start = std::time::Instant::now();
        let result = self.execute_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            crate::observability::QUERIES_TOTAL,
            "command" => label,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            crate::observability::QUERY_DURATION_SECONDS,
            "command" => label
        )
        .record(start.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Vec<Response>> {
        let engine = &self.engine;
        match cmd {
            Command::InsertFloor { id, name } => {
                engine.create_floor(id, name).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::InsertRoomType { id, code, name, capacity, base_price } => {
                engine
                    .create_room_type(id, code, name, capacity, base_price)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateRoomType { id, name, capacity, base_price } => {
                engine
                    .update_room_type(id, name, capacity, base_price)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertRoom { id, number, floor_id, room_type_id, status, notes } => {
                engine
                    .create_room(id, number, floor_id, room_type_id, status, notes)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateRoom { id, status, notes } => {
                engine
                    .update_room(id, status, notes)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteRoom { id } => {
                engine.delete_room(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertCustomer { id, name, phone, national_id, address } => {
                engine
                    .create_customer(id, name, phone, national_id, address)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateCustomer { id, name, phone, national_id, address } => {
                engine
                    .update_customer(id, name, phone, national_id, address)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertReservation { reservation } => {
                let outcome = engine
                    .create_reservation(reservation)
                    .await
                    .map_err(engine_err)?;
                if let Some(error) = &outcome.notice.error {
                    tracing::warn!(
                        reservation = %outcome.reservation.id,
                        error = %error,
                        "reservation recorded; guest notice failed"
                    );
                }
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateReservationStatus { id, status } => {
                let action = TransitionAction::toward(status).ok_or_else(|| {
                    PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "22023".into(),
                        "a reservation cannot transition back to pending".into(),
                    )))
                })?;
                let outcome = match action {
                    TransitionAction::Confirm => engine.confirm_reservation(id).await,
                    TransitionAction::CheckIn => engine.check_in_reservation(id).await,
                    TransitionAction::CheckOut => engine.check_out_reservation(id).await,
                    TransitionAction::Cancel => engine.cancel_reservation(id).await,
                }
                .map_err(engine_err)?;
                if let Some(notice) = &outcome.notice {
                    if let Some(error) = &notice.error {
                        tracing::warn!(reservation = %id, error = %error, "transition applied; guest notice failed");
                    }
                }
                for error in &outcome.cleaning_errors {
                    tracing::warn!(reservation = %id, error = %error, "transition applied; cleaning task failed");
                }
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::UpdateReservationFields { id, patch } => {
                engine
                    .update_reservation(id, patch)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteReservation { id } => {
                engine.delete_reservation(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertPayment { payment } => {
                engine.record_payment(payment).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateCleaningTask { id, status } => {
                engine
                    .resolve_cleaning_task(id, status)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::SelectFloors => {
                let schema = Arc::new(floors_schema());
                let rows: Vec<PgWireResult<_>> = self
                    .engine
                    .list_floors()
                    .into_iter()
                    .map(|f| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&f.id.to_string())?;
                        encoder.encode_field(&f.name)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectRoomTypes => {
                let schema = Arc::new(room_types_schema());
                let rows: Vec<PgWireResult<_>> = self
                    .engine
                    .list_room_types()
                    .into_iter()
                    .map(|t| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&t.id.to_string())?;
                        encoder.encode_field(&t.code)?;
                        encoder.encode_field(&t.name)?;
                        encoder.encode_field(&(t.capacity as i32))?;
                        encoder.encode_field(&t.base_price.to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectRooms => {
                let rooms = self.engine.list_rooms().await;
                Ok(vec![room_rows(rooms)])
            }
            Command::SelectAvailability { check_in, check_out, room_type_id, guest_count } => {
                let rooms = engine
                    .search_available(Stay { check_in, check_out }, room_type_id, guest_count)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![room_rows(rooms)])
            }
            Command::SelectFreeWindows { room_id, check_in, check_out } => {
                let windows = engine
                    .room_free_windows(room_id, Stay { check_in, check_out })
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(free_windows_schema());
                let rid = room_id.to_string();
                let rows: Vec<PgWireResult<_>> = windows
                    .into_iter()
                    .map(|w| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&rid)?;
                        encoder.encode_field(&w.check_in.to_string())?;
                        encoder.encode_field(&w.check_out.to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectReservations { id, customer_id } => {
                let reservations = match id {
                    Some(id) => engine.get_reservation(id).await.into_iter().collect(),
                    None => engine.list_reservations(customer_id).await,
                };
                let schema = Arc::new(reservations_schema());
                let rows: Vec<PgWireResult<_>> = reservations
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.code)?;
                        encoder.encode_field(&r.customer_id.to_string())?;
                        encoder.encode_field(&r.stay.check_in.to_string())?;
                        encoder.encode_field(&r.stay.check_out.to_string())?;
                        encoder.encode_field(&(r.guest_count as i32))?;
                        encoder.encode_field(&r.status.as_str())?;
                        encoder.encode_field(&r.notes)?;
                        encoder.encode_field(&assignments_json(&r))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectPayments { customer_id } => {
                let payments = engine.list_payments(customer_id).await;
                let schema = Arc::new(payments_schema());
                let rows: Vec<PgWireResult<_>> = payments
                    .into_iter()
                    .map(|p| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&p.id.to_string())?;
                        encoder.encode_field(&p.customer_id.to_string())?;
                        encoder.encode_field(&p.reservation_id.map(|r| r.to_string()))?;
                        encoder.encode_field(&p.reference)?;
                        encoder.encode_field(&p.method.as_str())?;
                        encoder.encode_field(&p.amount.to_string())?;
                        encoder.encode_field(&p.currency)?;
                        encoder.encode_field(&p.status.as_str())?;
                        encoder.encode_field(&p.notes)?;
                        encoder.encode_field(&p.created_at)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectCleaningTasks { status } => {
                let tasks = self.engine.list_cleaning_tasks(status);
                let schema = Arc::new(cleaning_schema());
                let rows: Vec<PgWireResult<_>> = tasks
                    .into_iter()
                    .map(|t| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&t.id.to_string())?;
                        encoder.encode_field(&t.room_id.to_string())?;
                        encoder.encode_field(&t.reservation_id.map(|r| r.to_string()))?;
                        encoder.encode_field(&t.kind.as_str())?;
                        encoder.encode_field(&t.status.as_str())?;
                        encoder.encode_field(&t.notified_at)?;
                        encoder.encode_field(&t.completed_at)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectLedger { customer_id } => {
                let (entries, _) = engine
                    .customer_ledger(customer_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(ledger_schema());
                let rows: Vec<PgWireResult<_>> = entries
                    .into_iter()
                    .map(|e| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&e.date.to_string())?;
                        encoder.encode_field(&e.description)?;
                        encoder.encode_field(&e.detail)?;
                        encoder.encode_field(&e.debit.to_string())?;
                        encoder.encode_field(&e.credit.to_string())?;
                        encoder.encode_field(&e.balance.to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::SelectBalance { customer_id } => {
                let summary = engine
                    .customer_balance(customer_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(balance_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&summary.total_debit.to_string())?;
                encoder.encode_field(&summary.total_credit.to_string())?;
                encoder.encode_field(&summary.balance.to_string())?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(vec![Response::Query(QueryResponse::new(schema, stream::iter(rows)))])
            }
            Command::Listen { channel } => {
                // channel is "<anything>_<ulid>"; the ULID names the entity
                let entity = channel.rsplit('_').next().unwrap_or(&channel);
                let _entity_id = Ulid::from_string(entity).map_err(|e| {
                    PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "42000".into(),
                        format!("bad ULID in channel {channel:?}: {e}"),
                    )))
                })?;
                Ok(vec![Response::Execution(Tag::new("LISTEN"))])
            }
        }
    }
}

fn room_rows(rooms: Vec<RoomInfo>) -> Response {
    let schema = Arc::new(rooms_schema());
    let rows: Vec<PgWireResult<_>> = rooms
        .into_iter()
        .map(|r| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&r.id.to_string())?;
            encoder.encode_field(&r.number)?;
            encoder.encode_field(&r.floor_id.to_string())?;
            encoder.encode_field(&r.room_type_id.to_string())?;
            encoder.encode_field(&r.status.as_str())?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

/// Room assignments in the same JSON shape INSERT accepts.
fn assignments_json(r: &Reservation) -> String {
    let specs: Vec<serde_json::Value> = r
        .rooms
        .iter()
        .map(|a| {
            serde_json::json!({
                "room_id": a.room_id.to_string(),
                "check_in_date": a.stay.map(|s| s.check_in.to_string()),
                "check_out_date": a.stay.map(|s| s.check_out.to_string()),
                "rate": a.rate.map(|d| d.to_string()),
                "currency": a.currency,
            })
        })
        .collect();
    serde_json::Value::Array(specs).to_string()
}

// ── Result schemas ───────────────────────────────────────────────

fn text_field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn rooms_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("number", Type::VARCHAR),
        text_field("floor_id", Type::VARCHAR),
        text_field("room_type_id", Type::VARCHAR),
        text_field("status", Type::VARCHAR),
    ]
}

fn floors_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("name", Type::VARCHAR),
    ]
}

fn room_types_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("code", Type::VARCHAR),
        text_field("name", Type::VARCHAR),
        text_field("capacity", Type::INT4),
        text_field("base_price", Type::NUMERIC),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("code", Type::VARCHAR),
        text_field("customer_id", Type::VARCHAR),
        text_field("check_in_date", Type::DATE),
        text_field("check_out_date", Type::DATE),
        text_field("guest_count", Type::INT4),
        text_field("status", Type::VARCHAR),
        text_field("notes", Type::VARCHAR),
        text_field("rooms", Type::VARCHAR),
    ]
}

fn payments_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("customer_id", Type::VARCHAR),
        text_field("reservation_id", Type::VARCHAR),
        text_field("reference", Type::VARCHAR),
        text_field("method", Type::VARCHAR),
        text_field("amount", Type::NUMERIC),
        text_field("currency", Type::VARCHAR),
        text_field("status", Type::VARCHAR),
        text_field("notes", Type::VARCHAR),
        text_field("created_at", Type::INT8),
    ]
}

fn cleaning_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("room_id", Type::VARCHAR),
        text_field("reservation_id", Type::VARCHAR),
        text_field("kind", Type::VARCHAR),
        text_field("status", Type::VARCHAR),
        text_field("notified_at", Type::INT8),
        text_field("completed_at", Type::INT8),
    ]
}

fn ledger_schema() -> Vec<FieldInfo> {
    vec![
        text_field("date", Type::DATE),
        text_field("description", Type::VARCHAR),
        text_field("detail", Type::VARCHAR),
        text_field("debit", Type::NUMERIC),
        text_field("credit", Type::NUMERIC),
        text_field("balance", Type::NUMERIC),
    ]
}

fn balance_schema() -> Vec<FieldInfo> {
    vec![
        text_field("total_debit", Type::NUMERIC),
        text_field("total_credit", Type::NUMERIC),
        text_field("balance", Type::NUMERIC),
    ]
}

fn schema_for(cmd: &Command) -> Vec<FieldInfo> {
    match cmd {
        Command::SelectFloors => floors_schema(),
        Command::SelectRoomTypes => room_types_schema(),
        Command::SelectRooms | Command::SelectAvailability { .. } => rooms_schema(),
        Command::SelectFreeWindows { .. } => free_windows_schema(),
        Command::SelectReservations { .. } => reservations_schema(),
        Command::SelectPayments { .. } => payments_schema(),
        Command::SelectCleaningTasks { .. } => cleaning_schema(),
        Command::SelectLedger { .. } => ledger_schema(),
        Command::SelectBalance { .. } => balance_schema(),
        _ => vec![],
    }
}

fn free_windows_schema() -> Vec<FieldInfo> {
    vec![
        text_field("room_id", Type::VARCHAR),
        text_field("check_in_date", Type::DATE),
        text_field("check_out_date", Type::DATE),
    ]
}

#[async_trait]
impl SimpleQueryHandler for FrontDeskHandler {
    async fn do_query<C>(&self, _client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.run_command(cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct FrontDeskQueryParser;

#[async_trait]
impl QueryParser for FrontDeskQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        match sql::parse_sql(stmt) {
            Ok(cmd) => Ok(schema_for(&cmd)),
            Err(_) => Ok(vec![]),
        }
    }
}

#[async_trait]
impl ExtendedQueryHandler for FrontDeskHandler {
    type Statement = String;
    type QueryParser = FrontDeskQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.run_command(cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        let fields = match sql::parse_sql(&target.statement) {
            Ok(cmd) => schema_for(&cmd),
            Err(_) => vec![],
        };
        Ok(DescribeStatementResponse::new(param_types, fields))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let fields = match sql::parse_sql(&target.statement.statement) {
            Ok(cmd) => schema_for(&cmd),
            Err(_) => vec![],
        };
        Ok(DescribePortalResponse::new(fields))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct FrontDeskFactory {
    handler: Arc<FrontDeskHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<FrontDeskAuthSource, DefaultServerParameterProvider>,
    >,
    noop: Arc<NoopHandler>,
}

impl FrontDeskFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = FrontDeskAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(FrontDeskHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for FrontDeskFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = FrontDeskFactory::new(engine, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

/// Map domain errors onto SQLSTATEs so callers can tell an availability
/// conflict from a lifecycle guard from an over-payment.
fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::Validation(_) => "22023",
        EngineError::RoomUnavailable { .. } => "23P01",
        EngineError::InvalidTransition { .. } => "23514",
        EngineError::PaymentExceedsBalance { .. } => "23514",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::NotFound(_) => "02000",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "58030",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
