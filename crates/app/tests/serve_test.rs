// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    net::TcpListener,
    thread,
    time::{Duration, Instant},
};

use serde_json::{Value, json};
use spoolmq_app::{Error, Settings, run_queue};
use spoolmq_common_storage_queue::FlushMode;
use spoolmq_common_transport::{QueueClient, Transport};
use tempfile::TempDir;

fn available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn settings_for(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.queue.directory = dir.path().join("queue");
    settings.queue.key_width = 12;
    settings.queue.flush_mode = FlushMode::Async;
    settings.subscriber.host = "127.0.0.1".to_string();
    settings.subscriber.port = available_port();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = available_port();
    settings.server.idle_pause_ms = 0;
    settings
}

#[test]
fn test_published_messages_are_served_in_order() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir);

    let transport = Transport::new();
    let publisher = transport
        .publisher(&settings.subscriber.endpoint())
        .unwrap();
    let client = QueueClient::connect(&transport, &settings.server.client_endpoint()).unwrap();

    let queue_settings = settings.clone();
    thread::spawn(move || run_queue(&queue_settings));

    // Publish warm-up messages until the subscription is live, then clear them.
    let deadline = Instant::now() + Duration::from_secs(10);
    for warmup in 0.. {
        publisher
            .send(json!({"warmup": warmup}).to_string().as_str(), 0)
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        if client.peek().unwrap().is_some() {
            break;
        }
        assert!(Instant::now() < deadline, "queue never received a message");
    }
    thread::sleep(Duration::from_millis(200));
    while client.peek().unwrap().is_some() {
        client.discard().unwrap();
    }

    for n in 1..=3 {
        publisher
            .send(json!({"n": n}).to_string().as_str(), 0)
            .unwrap();
    }
    let deadline = Instant::now() + Duration::from_secs(10);
    while client.peek().unwrap().is_none() {
        assert!(Instant::now() < deadline, "messages never arrived");
        thread::sleep(Duration::from_millis(10));
    }

    let mut received = Vec::new();
    while received.len() < 3 {
        if let Some(message) = client.pop().unwrap() {
            received.push(serde_json::from_slice::<Value>(&message).unwrap());
        } else {
            assert!(Instant::now() < deadline, "messages never arrived");
            thread::sleep(Duration::from_millis(10));
        }
    }
    assert_eq!(received, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    assert_eq!(client.peek().unwrap(), None);
}

#[test]
fn test_unreadable_queue_directory_fails_startup() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_for(&dir);
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"occupied").unwrap();
    settings.queue.directory = blocker;

    let err = run_queue(&settings).unwrap_err();
    assert!(matches!(err, Error::OpenStore { .. }));
}
