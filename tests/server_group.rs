use std::{
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use kurosabi_tst::{
    Router, ServerGroup,
    handler::{BoxedService, handler_fn},
    http::Response,
    server::{ConnCounter, ConnState, ServerBuilder},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn init_log() {
    env_logger::try_init_from_env(env_logger::Env::default().default_filter_or("debug")).unwrap_or_else(|_| ());
}

fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50000))
}

fn group_of(names: &[&str]) -> (ServerGroup, Vec<BoxedService>) {
    let services: Vec<BoxedService> = names.iter().map(|_| Arc::new(Router::new()) as BoxedService).collect();
    let servers = names
        .iter()
        .zip(&services)
        .map(|(name, svc)| ServerBuilder::new(Arc::clone(svc)).name(*name).port(0).build())
        .collect();
    (ServerGroup::new(servers), services)
}

/// name のサーバに state を n 回通知する
fn report(group: &ServerGroup, name: &str, state: ConnState, n: usize) {
    let server = group.servers().iter().find(|s| s.name() == name).unwrap();
    for _ in 0..n {
        server.track_state(peer(), state);
    }
}

fn least(group: &ServerGroup) -> String {
    group.least_used_server().unwrap().name().to_string()
}

#[test]
fn picks_the_instance_with_fewest_connections() {
    init_log();
    let (group, services) = group_of(&["a", "b", "c"]);
    report(&group, "a", ConnState::New, 3);
    report(&group, "b", ConnState::New, 1);
    report(&group, "c", ConnState::New, 2);

    assert_eq!(least(&group), "b");
    let chosen = group.least_used().unwrap();
    assert!(Arc::ptr_eq(&chosen, &services[1]));

    // 再選択は最新の値で行う
    report(&group, "b", ConnState::Active, 2);
    assert_eq!(least(&group), "c");

    report(&group, "a", ConnState::Closed, 3);
    assert_eq!(least(&group), "a");

    assert_eq!(
        group.open_connections(),
        vec![("a".to_string(), 0), ("b".to_string(), 3), ("c".to_string(), 2)]
    );
}

#[test]
fn ties_keep_the_current_order() {
    init_log();
    let (group, _) = group_of(&["a", "b", "c"]);
    assert_eq!(least(&group), "a");

    report(&group, "a", ConnState::New, 1);
    assert_eq!(least(&group), "b");
    report(&group, "a", ConnState::Closed, 1);
    // 全部 0 に戻っても安定ソートなので並びは b, c, a のまま
    assert_eq!(least(&group), "b");
}

#[test]
fn terminal_states_decrement() {
    init_log();
    let (group, _) = group_of(&["only"]);
    report(&group, "only", ConnState::New, 2);
    report(&group, "only", ConnState::Active, 1);
    report(&group, "only", ConnState::Hijacked, 1);
    report(&group, "only", ConnState::Closed, 1);
    assert_eq!(group.open_connections(), vec![("only".to_string(), 1)]);
}

#[test]
fn counter_never_goes_below_zero() {
    init_log();
    let counter = ConnCounter::new();
    counter.track(ConnState::Closed);
    assert_eq!(counter.open_conns(), 0);
    counter.track(ConnState::New);
    counter.track(ConnState::Hijacked);
    counter.track(ConnState::Hijacked);
    assert_eq!(counter.open_conns(), 0);
}

#[test]
fn empty_group_has_no_choice() {
    let group = ServerGroup::new(Vec::new());
    assert!(group.is_empty());
    assert!(group.least_used().is_none());
    assert!(group.open_connections().is_empty());
}

#[test]
fn counters_are_exact_under_concurrency() {
    init_log();
    let (group, _) = group_of(&["a", "b"]);
    let group = Arc::new(group);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let group = Arc::clone(&group);
            std::thread::spawn(move || {
                let name = if t % 2 == 0 { "a" } else { "b" };
                for _ in 0..1000 {
                    report(&group, name, ConnState::New, 1);
                    let _ = group.least_used();
                    report(&group, name, ConnState::Closed, 1);
                }
                report(&group, name, ConnState::New, 1);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(
        group.open_connections(),
        vec![("a".to_string(), 4), ("b".to_string(), 4)]
    );
}

async fn wait_for_open(group: &ServerGroup, expected: usize) {
    for _ in 0..200 {
        if group.open_connections()[0].1 == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("open connections never reached {}: {:?}", expected, group.open_connections());
}

#[tokio::test]
async fn live_connections_are_counted() {
    init_log();
    let mut router = Router::new();
    router
        .get("/hello/:name", handler_fn(|_req, ctx| {
            let mut res = Response::new();
            res.text(&format!("Hello, {}!", ctx.param("name").unwrap_or("?")));
            res
        }))
        .unwrap();
    let server = ServerBuilder::new(Arc::new(router))
        .name("live")
        .bind([127, 0, 0, 1])
        .port(0)
        .build();
    let group = ServerGroup::new(vec![server]);

    let server = Arc::clone(&group.servers()[0]);
    let listener = server.listen().unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    // 繋いだだけの接続も数える
    let idle = tokio::net::TcpStream::connect(addr).await.unwrap();
    wait_for_open(&group, 1).await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /hello/kuro HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{}", text);
    assert!(text.contains("Connection: close\r\n"));
    assert!(text.ends_with("Hello, kuro!"));

    drop(stream);
    wait_for_open(&group, 1).await;
    drop(idle);
    wait_for_open(&group, 0).await;
}

#[tokio::test]
async fn panicking_handler_still_reports_closed() {
    init_log();
    let mut router = Router::new();
    router.get("/boom", handler_fn(|_req, _ctx| panic!("handler exploded"))).unwrap();
    let server = ServerBuilder::new(Arc::new(router))
        .name("boom")
        .bind([127, 0, 0, 1])
        .port(0)
        .build();
    let group = ServerGroup::new(vec![server]);

    let server = Arc::clone(&group.servers()[0]);
    let listener = server.listen().unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /boom HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    // panic したタスクは何も返さずに閉じる
    let mut raw = Vec::new();
    let _ = stream.read_to_end(&mut raw).await;
    assert!(raw.is_empty());
    drop(stream);

    wait_for_open(&group, 0).await;
    assert_eq!(least(&group), "boom");
}
