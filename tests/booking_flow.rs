use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::{Config, NoTls, SimpleQueryMessage};
use ulid::Ulid;

use frontdesk::engine::Engine;
use frontdesk::notify::NotifyHub;
use frontdesk::sms::{LogOnlySms, ReservationNotices};
use frontdesk::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("frontdesk_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let notify = Arc::new(NotifyHub::new());
    let notices = ReservationNotices::new(Arc::new(LogOnlySms), "Integration Hotel".into());
    let engine = Arc::new(Engine::new(dir.join("frontdesk.wal"), notify, notices).unwrap());

    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine.clone();
            tokio::spawn(async move {
                let _ =
                    wire::process_connection(socket, engine, "frontdesk".to_string(), None).await;
            });
        }
    });

    addr
}

async fn connect(addr: SocketAddr) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("frontdesk")
        .user("frontdesk")
        .password("frontdesk");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

fn data_rows(messages: Vec<SimpleQueryMessage>) -> Vec<tokio_postgres::SimpleQueryRow> {
    messages
        .into_iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

struct Property {
    room: Ulid,
    second_room: Ulid,
    customer: Ulid,
}

/// Seed a floor, a 100-per-night type, two rooms and a customer over SQL.
async fn seed(client: &tokio_postgres::Client) -> Property {
    let floor = Ulid::new();
    let rtype = Ulid::new();
    let room = Ulid::new();
    let second_room = Ulid::new();
    let customer = Ulid::new();

    client
        .batch_execute(&format!("INSERT INTO floors VALUES ('{floor}', 'Ground')"))
        .await
        .unwrap();
    client
        .batch_execute(&format!(
            "INSERT INTO room_types VALUES ('{rtype}', 'STD', 'Standard', 2, 100)"
        ))
        .await
        .unwrap();
    client
        .batch_execute(&format!(
            "INSERT INTO rooms VALUES ('{room}', '101', '{floor}', '{rtype}')"
        ))
        .await
        .unwrap();
    client
        .batch_execute(&format!(
            "INSERT INTO rooms VALUES ('{second_room}', '102', '{floor}', '{rtype}')"
        ))
        .await
        .unwrap();
    client
        .batch_execute(&format!(
            "INSERT INTO customers VALUES ('{customer}', 'Awad Hassan', '+249912000000')"
        ))
        .await
        .unwrap();

    Property { room, second_room, customer }
}

fn rooms_json(room: Ulid) -> String {
    format!(r#"[{{"room_id": "{room}"}}]"#)
}

async fn book(
    client: &tokio_postgres::Client,
    p: &Property,
    room: Ulid,
    check_in: &str,
    check_out: &str,
) -> Result<Ulid, tokio_postgres::Error> {
    let id = Ulid::new();
    let rooms = rooms_json(room);
    client
        .batch_execute(&format!(
            "INSERT INTO reservations VALUES ('{id}', '{}', '{check_in}', '{check_out}', 1, '{rooms}')",
            p.customer
        ))
        .await
        .map(|_| id)
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn connect_and_list_rooms() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    let rows = data_rows(client.simple_query("SELECT * FROM rooms").await.unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("number"), Some("101"));
    assert_eq!(rows[1].get("number"), Some("102"));
    assert_eq!(rows[0].get("id"), Some(p.room.to_string().as_str()));
}

#[tokio::test]
async fn booking_conflicts_surface_as_errors() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();

    // overlap — rejected with the room in the message
    let err = book(&client, &p, p.room, "2024-01-03", "2024-01-06")
        .await
        .unwrap_err();
    let db_err = err.as_db_error().unwrap();
    assert!(db_err.message().contains("not available"));
    assert!(db_err.message().contains(&p.room.to_string()));

    // boundary touch — accepted
    book(&client, &p, p.room, "2024-01-05", "2024-01-08")
        .await
        .unwrap();

    // the other room is unaffected
    book(&client, &p, p.second_room, "2024-01-03", "2024-01-06")
        .await
        .unwrap();
}

#[tokio::test]
async fn availability_search_over_sql() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();

    let rows = data_rows(
        client
            .simple_query(
                "SELECT * FROM availability WHERE check_in_date = '2024-01-02' AND check_out_date = '2024-01-04'",
            )
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("number"), Some("102"));

    // guest_count above the type capacity filters everything out
    let rows = data_rows(
        client
            .simple_query(
                "SELECT * FROM availability WHERE check_in_date = '2024-02-01' AND check_out_date = '2024-02-03' AND guest_count = 5",
            )
            .await
            .unwrap(),
    );
    assert!(rows.is_empty());
}

#[tokio::test]
async fn lifecycle_over_sql() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    let id = book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();

    for status in ["confirmed", "checked_in"] {
        client
            .batch_execute(&format!(
                "UPDATE reservations SET status = '{status}' WHERE id = '{id}'"
            ))
            .await
            .unwrap();
    }

    // cancel after check-in is a lifecycle violation
    let err = client
        .batch_execute(&format!(
            "UPDATE reservations SET status = 'cancelled' WHERE id = '{id}'"
        ))
        .await
        .unwrap_err();
    assert!(err
        .as_db_error()
        .unwrap()
        .message()
        .contains("cannot cancel a checked_in reservation"));

    client
        .batch_execute(&format!(
            "UPDATE reservations SET status = 'checked_out' WHERE id = '{id}'"
        ))
        .await
        .unwrap();

    let rows = data_rows(
        client
            .simple_query(&format!("SELECT * FROM reservations WHERE id = '{id}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("status"), Some("checked_out"));

    // checkout queued a cleaning task for the room
    let rows = data_rows(
        client
            .simple_query("SELECT * FROM cleaning_tasks WHERE status = 'pending'")
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("room_id"), Some(p.room.to_string().as_str()));
    assert_eq!(rows[0].get("kind"), Some("checkout"));
}

#[tokio::test]
async fn transitions_out_of_order_rejected() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    let id = book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();

    // check-in straight from pending
    let err = client
        .batch_execute(&format!(
            "UPDATE reservations SET status = 'checked_in' WHERE id = '{id}'"
        ))
        .await
        .unwrap_err();
    let message = err.as_db_error().unwrap().message().to_string();
    assert!(message.contains("check_in"));
    assert!(message.contains("pending"));

    // status untouched
    let rows = data_rows(
        client
            .simple_query(&format!("SELECT * FROM reservations WHERE id = '{id}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("status"), Some("pending"));
}

#[tokio::test]
async fn payments_ledger_and_balance_over_sql() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    // 2 nights at 100 → 200 owed
    book(&client, &p, p.room, "2024-01-01", "2024-01-03")
        .await
        .unwrap();

    let pay_id = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO payments VALUES ('{pay_id}', '{}', 'cash', 150)",
            p.customer
        ))
        .await
        .unwrap();

    // 60 > remaining 50 — rejected with both figures
    let err = client
        .batch_execute(&format!(
            "INSERT INTO payments VALUES ('{}', '{}', 'cash', 60)",
            Ulid::new(),
            p.customer
        ))
        .await
        .unwrap_err();
    let message = err.as_db_error().unwrap().message().to_string();
    assert!(message.contains("60"));
    assert!(message.contains("50"));

    let rows = data_rows(
        client
            .simple_query(&format!(
                "SELECT * FROM balance WHERE customer_id = '{}'",
                p.customer
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("total_debit"), Some("200"));
    assert_eq!(rows[0].get("total_credit"), Some("150"));
    assert_eq!(rows[0].get("balance"), Some("50"));

    let rows = data_rows(
        client
            .simple_query(&format!(
                "SELECT * FROM ledger WHERE customer_id = '{}'",
                p.customer
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("debit"), Some("200"));
    assert_eq!(rows[0].get("balance"), Some("200"));
    assert_eq!(rows[1].get("credit"), Some("150"));
    assert_eq!(rows[1].get("balance"), Some("50"));

    let rows = data_rows(
        client
            .simple_query(&format!(
                "SELECT * FROM payments WHERE customer_id = '{}'",
                p.customer
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("reference").unwrap().starts_with("PAY-"));
}

#[tokio::test]
async fn extended_protocol_with_parameters() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    let id = book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();

    let rows = client
        .query(
            "SELECT * FROM reservations WHERE id = $1",
            &[&id.to_string()],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let code: &str = rows[0].get("code");
    assert!(code.starts_with("RES-"));
    let status: &str = rows[0].get("status");
    assert_eq!(status, "pending");
}

#[tokio::test]
async fn update_reservation_dates_over_sql() {
    let addr = start_test_server().await;
    let client = connect(addr).await;
    let p = seed(&client).await;

    let first = book(&client, &p, p.room, "2024-01-10", "2024-01-15")
        .await
        .unwrap();
    let movable = book(&client, &p, p.room, "2024-01-01", "2024-01-05")
        .await
        .unwrap();
    let _ = first;

    // slide onto the other booking — rejected
    let err = client
        .batch_execute(&format!(
            "UPDATE reservations SET check_in_date = '2024-01-12', check_out_date = '2024-01-14' WHERE id = '{movable}'"
        ))
        .await
        .unwrap_err();
    assert!(err.as_db_error().unwrap().message().contains("not available"));

    // free span — accepted
    client
        .batch_execute(&format!(
            "UPDATE reservations SET check_in_date = '2024-01-05', check_out_date = '2024-01-08' WHERE id = '{movable}'"
        ))
        .await
        .unwrap();

    let rows = data_rows(
        client
            .simple_query(&format!(
                "SELECT * FROM reservations WHERE id = '{movable}'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("check_in_date"), Some("2024-01-05"));
    assert_eq!(rows[0].get("check_out_date"), Some("2024-01-08"));
}
