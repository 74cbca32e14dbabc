//! Line-delimited JSON server that lets a UI inspect and edit the rule set and the layer
//! stack while the hook is running.

use crate::RemapEngine;
#[cfg(feature = "tcp_server")]
use crate::{oskbd::KbdOut, send_deferred, OutputEvent};
use anyhow::Result;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub use keylayer_tcp_protocol::{ClientMessage, ServerMessage, ServerResponse};

#[cfg(feature = "tcp_server")]
type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(feature = "tcp_server")]
use std::net::TcpStream;

#[cfg(feature = "tcp_server")]
pub type Connections = Arc<Mutex<HashMap<String, TcpStream>>>;
#[cfg(not(feature = "tcp_server"))]
pub type Connections = ();

pub struct TcpServer {
    pub address: SocketAddr,
    pub connections: Connections,
}

impl TcpServer {
    #[cfg(feature = "tcp_server")]
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connections: Arc::new(Mutex::new(HashMap::default())),
        }
    }

    #[cfg(not(feature = "tcp_server"))]
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            connections: (),
        }
    }

    #[cfg(feature = "tcp_server")]
    pub fn start(&mut self, engine: Arc<Mutex<RemapEngine>>) -> Result<()> {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind(self.address)?;
        log::info!("TCP server listening on {}", self.address);
        let connections = self.connections.clone();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        log::error!("not able to accept client connection: {e}");
                        continue;
                    }
                };
                let addr = match stream.peer_addr() {
                    Ok(a) => a.to_string(),
                    Err(e) => {
                        log::warn!("client without a peer address, dropping it: {e}");
                        continue;
                    }
                };
                let greeting = ServerMessage::LayerChange {
                    stack: engine.lock().get_layer_stack(),
                };
                if let Err(e) = stream.write_all(&greeting.as_bytes()) {
                    log::warn!("failed to write to stream, dropping it: {e:?}");
                    continue;
                }
                let reader = match stream.try_clone() {
                    Ok(s) => s,
                    Err(e) => {
                        log::warn!("could not clone client stream, dropping it: {e}");
                        continue;
                    }
                };
                connections.lock().insert(addr.clone(), stream);
                log::info!("listening for incoming messages {addr}");

                let connections = connections.clone();
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let mut out = match KbdOut::new() {
                        Ok(o) => o,
                        Err(e) => {
                            log::error!("no output handle for tcp client {addr}: {e}");
                            connections.lock().remove(&addr);
                            return;
                        }
                    };
                    for line in BufReader::new(reader).lines() {
                        let Ok(line) = line else {
                            break;
                        };
                        if line.trim().is_empty() {
                            continue;
                        }
                        let reply = match line.parse::<ClientMessage>() {
                            Ok(msg) => {
                                log::debug!("tcp client {addr}: {msg:?}");
                                let (reply, sends) = handle_off_hook(&engine, msg);
                                send_deferred(&mut out, &sends);
                                reply
                            }
                            Err(e) => {
                                log::warn!("client {addr} sent an invalid message: {e}");
                                ServerResponse::Error {
                                    msg: format!("invalid message: {e}"),
                                }
                                .as_bytes()
                            }
                        };
                        if !write_to_client(&connections, &addr, &reply) {
                            break;
                        }
                    }
                    log::warn!("removing disconnected tcp client: {addr}");
                    connections.lock().remove(&addr);
                });
            }
        });
        Ok(())
    }

    #[cfg(not(feature = "tcp_server"))]
    pub fn start(&mut self, _engine: Arc<Mutex<RemapEngine>>) -> Result<()> {
        Ok(())
    }
}

/// Apply a request from a thread other than the hook thread. Output the request causes is
/// returned instead of sent, to be sent once the engine lock is released.
#[cfg(feature = "tcp_server")]
pub fn handle_off_hook(
    engine: &Mutex<RemapEngine>,
    msg: ClientMessage,
) -> (Vec<u8>, Vec<OutputEvent>) {
    let mut k = engine.lock();
    k.sender.defer_output();
    let reply = handle_client_message(&mut k, msg);
    let sends = k.sender.take_deferred();
    (reply, sends)
}

/// Write to one client under the connections lock, the same lock notifications are written
/// under, so lines never interleave. Returns `false` if the client is gone.
#[cfg(feature = "tcp_server")]
fn write_to_client(clients: &Connections, addr: &str, bytes: &[u8]) -> bool {
    use std::io::Write;
    match clients.lock().get_mut(addr) {
        Some(stream) => stream.write_all(bytes).is_ok(),
        None => false,
    }
}

/// Apply one client request and return the serialized reply.
#[cfg(feature = "tcp_server")]
pub fn handle_client_message(k: &mut RemapEngine, msg: ClientMessage) -> Vec<u8> {
    use keylayer_parser::cfg::{KeyBinding, Layer, Trigger};
    use keylayer_tcp_protocol::LayerBindings;

    fn status(r: Result<()>) -> Vec<u8> {
        match r {
            Ok(()) => ServerResponse::Ok.as_bytes(),
            Err(e) => ServerResponse::Error {
                msg: e.to_string(),
            }
            .as_bytes(),
        }
    }

    fn parse_trigger(s: &str) -> Result<Trigger> {
        s.parse::<Trigger>().map_err(anyhow::Error::msg)
    }

    match msg {
        ClientMessage::RequestLayerNames {} => ServerMessage::LayerNames {
            names: k.get_layers(),
        }
        .as_bytes(),
        ClientMessage::RequestLayerStack {} => ServerMessage::LayerStack {
            stack: k.get_layer_stack(),
        }
        .as_bytes(),
        ClientMessage::RequestBindings { vk } => {
            let layers = k
                .get_bindings(vk)
                .into_iter()
                .map(|(layer, bindings)| LayerBindings {
                    layer,
                    bindings: serde_json::to_value(bindings).unwrap_or_default(),
                })
                .collect();
            ServerMessage::Bindings { vk, layers }.as_bytes()
        }
        ClientMessage::RequestAction { vk, trigger } => match parse_trigger(&trigger) {
            Ok(t) => {
                let found = k.get_action(vk, t);
                ServerMessage::Action {
                    vk,
                    trigger,
                    layer: found.as_ref().map(|(l, _)| l.clone()),
                    action: found.and_then(|(_, a)| serde_json::to_value(a).ok()),
                }
                .as_bytes()
            }
            Err(e) => ServerMessage::Error { msg: e.to_string() }.as_bytes(),
        },
        ClientMessage::PushLayer { layer } => status(k.push_layer(&layer)),
        ClientMessage::PopLayer { layer } => {
            k.pop_layer(&layer);
            ServerResponse::Ok.as_bytes()
        }
        ClientMessage::ToggleLayer { layer } => status(k.toggle_layer(&layer)),
        ClientMessage::ChangeLayer { new } => status(k.set_layer(&new)),
        ClientMessage::AddBinding { layer, vk, binding } => status(
            serde_json::from_value::<KeyBinding>(binding)
                .map_err(anyhow::Error::from)
                .and_then(|b| k.add_binding(&layer, vk, b)),
        ),
        ClientMessage::RemoveBinding { layer, vk, trigger } => status(
            parse_trigger(&trigger).and_then(|t| k.remove_binding(&layer, vk, t)),
        ),
        ClientMessage::AddLayer { layer } => status(
            serde_json::from_value::<Layer>(layer)
                .map_err(anyhow::Error::from)
                .and_then(|l| k.add_layer(l)),
        ),
        ClientMessage::RemoveLayer { layer } => status(k.remove_layer(&layer)),
        ClientMessage::ReleaseAll {} => {
            k.release_all();
            ServerResponse::Ok.as_bytes()
        }
    }
}

/// Relay engine notifications to every connected client, dropping clients that went away.
#[cfg(feature = "tcp_server")]
pub fn start_notification_loop(rx: Receiver<ServerMessage>, clients: Connections) {
    use std::io::Write;
    log::info!("listening for event notifications to relay to connected clients");
    std::thread::spawn(move || {
        for event in rx.iter() {
            let notification = event.as_bytes();
            let mut clients = clients.lock();
            let mut stale_clients = vec![];
            for (id, client) in clients.iter_mut() {
                match client.write_all(&notification) {
                    Ok(_) => log::trace!("notification sent to {id}"),
                    Err(_) => stale_clients.push(id.clone()),
                }
            }
            for id in &stale_clients {
                log::warn!("removing disconnected tcp client: {id}");
                clients.remove(id);
            }
        }
        log::info!("notification channel closed");
    });
}

#[cfg(not(feature = "tcp_server"))]
pub fn start_notification_loop(_rx: Receiver<ServerMessage>, _clients: Connections) {}

#[cfg(all(test, feature = "tcp_server"))]
mod tests {
    use super::*;

    const CFG: &str = r#"{ "layers": [
        { "id": "base", "bindings": { "65": [ { "trigger": "tap", "action": { "type": "remap", "keys": [66] } } ] } },
        { "id": "nav" }
    ] }"#;

    fn reply(k: &mut RemapEngine, msg: &str) -> serde_json::Value {
        let bytes = handle_client_message(k, msg.parse().unwrap());
        assert_eq!(bytes.last(), Some(&b'\n'));
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn layer_requests() {
        let mut k = RemapEngine::new_from_str(CFG).unwrap();
        let r = reply(&mut k, r#"{"RequestLayerNames":{}}"#);
        assert_eq!(r["LayerNames"]["names"], serde_json::json!(["base", "nav"]));

        let r = reply(&mut k, r#"{"PushLayer":{"layer":"nav"}}"#);
        assert_eq!(r["status"], "Ok");
        let r = reply(&mut k, r#"{"RequestLayerStack":{}}"#);
        assert_eq!(r["LayerStack"]["stack"], serde_json::json!(["base", "nav"]));

        let r = reply(&mut k, r#"{"PushLayer":{"layer":"ghost"}}"#);
        assert_eq!(r["status"], "Error");

        let r = reply(&mut k, r#"{"PopLayer":{"layer":"base"}}"#);
        assert_eq!(r["status"], "Ok");
        assert_eq!(k.get_layer_stack(), vec!["base", "nav"]);
    }

    #[test]
    fn binding_requests() {
        let mut k = RemapEngine::new_from_str(CFG).unwrap();
        let r = reply(&mut k, r#"{"RequestAction":{"vk":65,"trigger":"tap"}}"#);
        assert_eq!(r["Action"]["layer"], "base");
        assert_eq!(r["Action"]["action"]["type"], "remap");

        let r = reply(
            &mut k,
            r#"{"AddBinding":{"layer":"nav","vk":65,"binding":{"trigger":"tap","action":{"type":"none"}}}}"#,
        );
        assert_eq!(r["status"], "Ok");
        let r = reply(&mut k, r#"{"RequestBindings":{"vk":65}}"#);
        assert_eq!(r["Bindings"]["layers"].as_array().unwrap().len(), 2);

        let r = reply(&mut k, r#"{"RemoveBinding":{"layer":"nav","vk":65,"trigger":"hold"}}"#);
        assert_eq!(r["status"], "Error");
        let r = reply(&mut k, r#"{"RemoveBinding":{"layer":"nav","vk":65,"trigger":"tap"}}"#);
        assert_eq!(r["status"], "Ok");

        let r = reply(&mut k, r#"{"RequestAction":{"vk":90,"trigger":"tap"}}"#);
        assert!(r["Action"]["action"].is_null());
    }

    #[test]
    fn layer_edits() {
        let mut k = RemapEngine::new_from_str(CFG).unwrap();
        let r = reply(&mut k, r#"{"AddLayer":{"layer":{"id":"sym"}}}"#);
        assert_eq!(r["status"], "Ok");
        let r = reply(&mut k, r#"{"ChangeLayer":{"new":"sym"}}"#);
        assert_eq!(r["status"], "Ok");
        assert_eq!(k.get_layer_stack(), vec!["base", "sym"]);
        let r = reply(&mut k, r#"{"RemoveLayer":{"layer":"sym"}}"#);
        assert_eq!(r["status"], "Ok");
        assert_eq!(k.get_layer_stack(), vec!["base"]);
        let r = reply(&mut k, r#"{"RemoveLayer":{"layer":"base"}}"#);
        assert_eq!(r["status"], "Ok");
        assert_eq!(k.get_layers(), vec!["base", "nav"]);
        let r = reply(&mut k, r#"{"RemoveLayer":{"layer":"ghost"}}"#);
        assert_eq!(r["status"], "Error");
        let r = reply(&mut k, r#"{"ReleaseAll":{}}"#);
        assert_eq!(r["status"], "Ok");
    }

    #[test]
    fn off_hook_requests_return_their_output() {
        let mut k = RemapEngine::new_from_str(CFG).unwrap();
        k.sender.press(0x10);
        let engine = Mutex::new(k);
        let (bytes, sends) = handle_off_hook(&engine, r#"{"ReleaseAll":{}}"#.parse().unwrap());
        let r: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(r["status"], "Ok");
        assert_eq!(sends, vec![OutputEvent::Release(0x10)]);

        let k = engine.lock();
        assert!(k.sender.pressed_keys().is_empty());
        assert_eq!("dn:Shift", k.sender.kbd_out.outputs.to_ascii());
    }

    #[test]
    fn replies_are_written_through_the_shared_connection() {
        use std::io::Read;
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        let clients: Connections = Arc::new(Mutex::new(HashMap::default()));
        clients.lock().insert("ui".into(), server_side);

        assert!(write_to_client(&clients, "ui", b"{}\n"));
        assert!(!write_to_client(&clients, "gone", b"{}\n"));
        let mut buf = [0u8; 3];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"{}\n");
    }
}
