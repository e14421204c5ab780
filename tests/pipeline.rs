mod integration {
    mod pipeline {

        extern crate hyper;
        extern crate tallyd;

        use self::hyper::header::{AcceptEncoding, ContentType, Encoding, QualityItem};
        use self::hyper::status::StatusCode;
        use self::tallyd::agent::{Agent, Collector, Format, HttpTransport, Transport};
        use self::tallyd::http::Server;
        use self::tallyd::ingest::Endpoint;
        use self::tallyd::metric::Metric;
        use self::tallyd::protocols::gzip;
        use self::tallyd::service::Aggregator;
        use self::tallyd::store::MemStore;
        use self::tallyd::thread::{Poll, Stoppable};
        use std::io::Read;
        use std::sync::Arc;
        use std::time::Duration;

        fn start() -> (Server, String) {
            let endpoint = Endpoint::new(Aggregator::new(Arc::new(MemStore::new())));
            let server = Server::new("127.0.0.1:0", 2, endpoint).unwrap();
            let addr = server.local_addr().unwrap().to_string();
            (server, addr)
        }

        fn get(url: &str) -> (StatusCode, String) {
            let client = hyper::Client::new();
            let mut res = client.get(url).send().unwrap();
            let mut body = String::new();
            res.read_to_string(&mut body).unwrap();
            (res.status, body)
        }

        #[test]
        fn json_gzip_counter_accumulates() {
            let (server, addr) = start();
            let mut transport = HttpTransport::new(&addr, Format::Json, true).unwrap();
            transport.send(&Metric::counter("hits", 5)).unwrap();
            transport.send(&Metric::counter("hits", 7)).unwrap();

            let (status, body) = get(&format!("http://{}/value/counter/hits", addr));
            assert_eq!(StatusCode::Ok, status);
            assert_eq!("12", body);
            server.shutdown();
        }

        #[test]
        fn path_gauge_last_write_wins() {
            let (server, addr) = start();
            let mut transport = HttpTransport::new(&addr, Format::Path, false).unwrap();
            transport.send(&Metric::gauge("temp", 10.5)).unwrap();
            transport.send(&Metric::gauge("temp", 20.7)).unwrap();

            let (status, body) = get(&format!("http://{}/value/gauge/temp", addr));
            assert_eq!(StatusCode::Ok, status);
            assert_eq!("20.7", body);
            server.shutdown();
        }

        #[test]
        fn path_mode_escapes_ids() {
            let (server, addr) = start();
            let mut transport = HttpTransport::new(&addr, Format::Path, false).unwrap();
            transport.send(&Metric::counter("my metric", 3)).unwrap();

            let mut json = HttpTransport::new(&addr, Format::Json, true).unwrap();
            json.send(&Metric::counter("my metric", 4)).unwrap();

            let (status, body) = get(&format!("http://{}/value/counter/my%20metric", addr));
            assert_eq!(StatusCode::Ok, status);
            assert_eq!("7", body);

            let (_, listing) = get(&format!("http://{}/", addr));
            assert_eq!("counter/my metric: 7\n", listing);
            server.shutdown();
        }

        #[test]
        fn plain_json_and_listing() {
            let (server, addr) = start();
            let mut transport = HttpTransport::new(&addr, Format::Json, false).unwrap();
            transport.send(&Metric::gauge("Alloc", 1.5)).unwrap();
            transport.send(&Metric::counter("PollCount", 3)).unwrap();

            let (status, body) = get(&format!("http://{}/", addr));
            assert_eq!(StatusCode::Ok, status);
            assert_eq!("counter/PollCount: 3\ngauge/Alloc: 1.5\n", body);
            server.shutdown();
        }

        #[test]
        fn unknown_metric_is_not_found() {
            let (server, addr) = start();
            let (status, _) = get(&format!("http://{}/value/gauge/absent", addr));
            assert_eq!(StatusCode::NotFound, status);
            let (status, _) = get(&format!("http://{}/value/histogram/x", addr));
            assert_eq!(StatusCode::NotFound, status);
            server.shutdown();
        }

        #[test]
        fn bad_json_is_rejected() {
            let (server, addr) = start();
            let client = hyper::Client::new();
            let res = client
                .post(&format!("http://{}/update", addr)[..])
                .header(ContentType::json())
                .body(r#"{"id":"x","type":"histogram","value":1}"#)
                .send()
                .unwrap();
            assert_eq!(StatusCode::BadRequest, res.status);
            server.shutdown();
        }

        #[test]
        fn responses_are_compressed_on_request() {
            let (server, addr) = start();
            let mut transport = HttpTransport::new(&addr, Format::Path, false).unwrap();
            transport.send(&Metric::counter("hits", 2)).unwrap();

            let client = hyper::Client::new();
            let mut res = client
                .get(&format!("http://{}/", addr)[..])
                .header(AcceptEncoding(vec![QualityItem::new(
                    Encoding::Gzip,
                    hyper::header::Quality(1000),
                )]))
                .send()
                .unwrap();
            assert_eq!(StatusCode::Ok, res.status);
            let encoding = res.headers.get_raw("Content-Encoding").unwrap();
            assert_eq!(b"gzip".to_vec(), encoding[0]);
            let vary = res.headers.get_raw("Vary").unwrap();
            assert_eq!(b"Accept-Encoding".to_vec(), vary[0]);

            let mut body = Vec::new();
            res.read_to_end(&mut body).unwrap();
            let plain = gzip::decompress(&body).unwrap();
            assert_eq!(b"counter/hits: 2\n".to_vec(), plain);
            server.shutdown();
        }

        struct Fixed;

        impl Collector for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }

            fn collect(&mut self) -> Vec<Metric> {
                vec![Metric::counter("PollCount", 1), Metric::gauge("Load", 0.25)]
            }
        }

        #[test]
        fn agent_reports_to_server() {
            let (server, addr) = start();
            let transport = HttpTransport::new(&addr, Format::Json, true).unwrap();
            let mut agent = Agent::new(
                Fixed,
                transport,
                Duration::from_millis(5),
                Duration::from_millis(10),
            );
            let poll = Poll::new();
            let stopper = poll.clone();
            let worker = ::std::thread::spawn(move || agent.run(&poll));

            let url = format!("http://{}/value/counter/PollCount", addr);
            let mut reported = false;
            for _ in 0..200 {
                let (status, body) = get(&url);
                if status == StatusCode::Ok && body.parse::<i64>().unwrap() >= 2 {
                    reported = true;
                    break;
                }
                ::std::thread::sleep(Duration::from_millis(10));
            }
            stopper.shutdown();
            worker.join().unwrap();
            assert!(reported);

            let (_, load) = get(&format!("http://{}/value/gauge/Load", addr));
            assert_eq!("0.25", load);
            server.shutdown();
        }
    }
}
