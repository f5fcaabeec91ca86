//! MQTT telemetry client
//!
//! Wraps a `rumqttc` client whose event loop runs on a spawned task.
//! Incoming publishes are fanned out to every [`MqttClient::messages`]
//! receiver.

mod message;

pub use message::{IncomingMessage, Message, MqttMessage, Qos};

use crate::auth::Auth;
use crate::config::MqttConfig;
use crate::error::{LynxError, LynxResult};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, Transport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long a single publish may take to be queued
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

/// How long `disconnect` waits for the event loop to wind down
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const REQUEST_CAPACITY: usize = 64;
const INCOMING_CAPACITY: usize = 256;

/// Parsed broker URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerAddress {
    /// Parse `tcp://`, `mqtt://`, `ssl://`, `tls://` or `mqtts://` URIs
    pub fn parse(uri: &str) -> LynxResult<Self> {
        let url = url::Url::parse(uri.trim())?;
        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" => true,
            other => {
                return Err(LynxError::InvalidOptions(format!(
                    "unsupported broker scheme '{other}' in {uri}"
                )))
            }
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| LynxError::InvalidOptions(format!("missing broker host in {uri}")))?
            .to_string();
        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

        Ok(Self { host, port, tls })
    }
}

/// Connection state published by the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed(String),
}

type ConnectHandler = Arc<dyn Fn() + Send + Sync>;
type LostHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks run from the event loop task
#[derive(Clone, Default)]
pub struct ConnectionHandlers {
    on_connect: Option<ConnectHandler>,
    on_lost: Option<LostHandler>,
}

impl ConnectionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every successful (re)connect, before `connect` returns
    pub fn on_connect(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(handler));
        self
    }

    /// Called with the reason when an established connection drops
    pub fn on_connection_lost(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_lost = Some(Arc::new(handler));
        self
    }
}

/// MQTT client connected to the Lynx broker
pub struct MqttClient {
    client: AsyncClient,
    incoming: broadcast::Sender<IncomingMessage>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl MqttClient {
    /// Connect with the given settings
    pub async fn connect(config: &MqttConfig, auth: &Auth) -> LynxResult<Self> {
        Self::connect_with(config, auth, ConnectionHandlers::default()).await
    }

    /// Connect with connection callbacks
    ///
    /// Fails if the broker does not accept the connection within the
    /// configured timeout.
    pub async fn connect_with(
        config: &MqttConfig,
        auth: &Auth,
        handlers: ConnectionHandlers,
    ) -> LynxResult<Self> {
        let broker = BrokerAddress::parse(&config.broker)?;
        let client_id = if config.client_id.is_empty() {
            format!("lynx-{}", Uuid::new_v4())
        } else {
            config.client_id.clone()
        };

        let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(config.clean_session);
        if let Some((user, password)) = auth.mqtt_credentials() {
            options.set_credentials(user, password);
        }
        if broker.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        debug!(
            "Connecting to MQTT broker {}:{} (tls: {})",
            broker.host, broker.port, broker.tls
        );

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (incoming, _) = broadcast::channel(INCOMING_CAPACITY);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);

        let task = tokio::spawn(run_event_loop(
            eventloop,
            EventLoopContext {
                state: state_tx,
                incoming: incoming.clone(),
                handlers,
                connection_log: config.connection_log,
                auto_reconnect: config.auto_reconnect,
                retry_interval: config.retry_interval(),
            },
        ));

        let mqtt = Self {
            client,
            incoming,
            state,
            task,
        };

        match timeout(config.timeout(), mqtt.wait_connected()).await {
            Ok(Ok(())) => Ok(mqtt),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LynxError::Timeout),
        }
    }

    async fn wait_connected(&self) -> LynxResult<()> {
        let mut state = self.state.clone();
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Failed(reason) => return Err(LynxError::Mqtt(reason)),
                ConnectionState::Disconnected => {
                    return Err(LynxError::Mqtt("disconnected".to_string()))
                }
                ConnectionState::Connecting => {}
            }
            state
                .changed()
                .await
                .map_err(|_| LynxError::Mqtt("event loop stopped".to_string()))?;
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// Publish a JSON payload, waiting up to one second
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
        qos: Qos,
    ) -> LynxResult<()> {
        let data = serde_json::to_vec(payload)?;
        match timeout(PUBLISH_TIMEOUT, self.enqueue(topic, qos, data)).await {
            Ok(result) => result,
            Err(_) => Err(LynxError::PublishTimeout(topic.to_string())),
        }
    }

    /// Publish every message, returning one error per failed topic
    pub async fn publish_all(&self, messages: &[MqttMessage]) -> Vec<LynxError> {
        let mut errors = Vec::new();
        for message in messages {
            if let Err(e) = self.publish_message(message).await {
                errors.push(e);
            }
        }
        errors
    }

    /// Like [`publish_all`](Self::publish_all), bounded by a shared deadline
    pub async fn publish_all_timeout(
        &self,
        messages: &[MqttMessage],
        limit: Duration,
    ) -> Vec<LynxError> {
        let deadline = Instant::now() + limit;
        let mut errors = Vec::new();
        for message in messages {
            match timeout_at(deadline, self.publish_message(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(_) => errors.push(LynxError::PublishTimeout(message.topic.clone())),
            }
        }
        errors
    }

    async fn publish_message(&self, message: &MqttMessage) -> LynxResult<()> {
        let data = serde_json::to_vec(&message.msg).map_err(|e| LynxError::Publish {
            topic: message.topic.clone(),
            message: e.to_string(),
        })?;
        self.enqueue(&message.topic, message.qos, data).await
    }

    async fn enqueue(&self, topic: &str, qos: Qos, data: Vec<u8>) -> LynxResult<()> {
        self.client
            .publish(topic, qos.into(), false, data)
            .await
            .map_err(|e| LynxError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    pub async fn subscribe(&self, topic: &str, qos: Qos) -> LynxResult<()> {
        debug!("Subscribing to {}", topic);
        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|e| LynxError::Mqtt(e.to_string()))
    }

    pub async fn unsubscribe(&self, topic: &str) -> LynxResult<()> {
        debug!("Unsubscribing from {}", topic);
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|e| LynxError::Mqtt(e.to_string()))
    }

    /// Receiver for publishes on subscribed topics
    pub fn messages(&self) -> broadcast::Receiver<IncomingMessage> {
        self.incoming.subscribe()
    }

    /// Disconnect from the broker
    pub async fn disconnect(&self) -> LynxResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| LynxError::Mqtt(e.to_string()))?;

        let mut state = self.state.clone();
        let stopped = async {
            while !matches!(
                *state.borrow_and_update(),
                ConnectionState::Disconnected | ConnectionState::Failed(_)
            ) {
                if state.changed().await.is_err() {
                    break;
                }
            }
        };
        if timeout(DISCONNECT_TIMEOUT, stopped).await.is_err() {
            debug!("MQTT event loop did not stop in time");
        }
        Ok(())
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct EventLoopContext {
    state: watch::Sender<ConnectionState>,
    incoming: broadcast::Sender<IncomingMessage>,
    handlers: ConnectionHandlers,
    connection_log: bool,
    auto_reconnect: bool,
    retry_interval: Duration,
}

async fn run_event_loop(mut eventloop: EventLoop, ctx: EventLoopContext) {
    let mut connected_once = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected_once = true;
                if ctx.connection_log {
                    info!("MQTT: connected");
                }
                if let Some(handler) = &ctx.handlers.on_connect {
                    handler();
                }
                ctx.state.send_replace(ConnectionState::Connected);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                // No receivers is not an error
                let _ = ctx.incoming.send(IncomingMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT: disconnected");
                ctx.state.send_replace(ConnectionState::Disconnected);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let reason = e.to_string();
                if !connected_once {
                    debug!("MQTT: connect failed: {}", reason);
                    ctx.state.send_replace(ConnectionState::Failed(reason));
                    break;
                }

                if *ctx.state.borrow() == ConnectionState::Connected {
                    if ctx.connection_log {
                        warn!("MQTT: connection lost: {}", reason);
                    }
                    ctx.state.send_replace(ConnectionState::Connecting);
                    if let Some(handler) = &ctx.handlers.on_lost {
                        handler(reason.as_str());
                    }
                }

                if !ctx.auto_reconnect {
                    ctx.state.send_replace(ConnectionState::Failed(reason));
                    break;
                }

                debug!("MQTT: reconnecting in {:?}", ctx.retry_interval);
                tokio::time::sleep(ctx.retry_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_broker_defaults() {
        assert_eq!(
            BrokerAddress::parse("tcp://lynx.iotopen.se").unwrap(),
            BrokerAddress {
                host: "lynx.iotopen.se".to_string(),
                port: 1883,
                tls: false,
            }
        );
        assert_eq!(
            BrokerAddress::parse("ssl://lynx.iotopen.se").unwrap(),
            BrokerAddress {
                host: "lynx.iotopen.se".to_string(),
                port: 8883,
                tls: true,
            }
        );
    }

    #[test]
    fn test_parse_broker_schemes() {
        let broker = BrokerAddress::parse("mqtts://broker.local:18883").unwrap();
        assert!(broker.tls);
        assert_eq!(broker.port, 18883);

        let broker = BrokerAddress::parse("mqtt://10.0.0.2:1884").unwrap();
        assert!(!broker.tls);
        assert_eq!(broker.host, "10.0.0.2");
        assert_eq!(broker.port, 1884);

        assert!(BrokerAddress::parse("tls://broker").unwrap().tls);
    }

    #[test]
    fn test_parse_broker_rejects() {
        assert!(BrokerAddress::parse("ws://broker:9001").is_err());
        assert!(BrokerAddress::parse("http://broker").is_err());
        assert!(BrokerAddress::parse("broker:1883").is_err());
        assert!(BrokerAddress::parse("").is_err());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port, then close it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = MqttConfig::new(format!("tcp://127.0.0.1:{port}"));
        config.timeout_ms = 5000;

        let err = MqttClient::connect(&config, &Auth::None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LynxError::Mqtt(_)));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        // Accepts TCP but never answers CONNECT
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _accept = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let mut config = MqttConfig::new(format!("tcp://127.0.0.1:{port}"));
        config.timeout_ms = 200;

        let err = MqttClient::connect(&config, &Auth::api_key("k3y"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LynxError::Timeout));
    }

    async fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let kind = stream.read_u8().await?;
        let mut len = 0usize;
        let mut shift = 0;
        loop {
            let byte = stream.read_u8().await?;
            len |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0; len];
        stream.read_exact(&mut body).await?;
        Ok((kind, body))
    }

    fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = (topic.len() as u16).to_be_bytes().to_vec();
        body.extend_from_slice(topic.as_bytes());
        body.extend_from_slice(payload);
        let mut packet = vec![0x30, body.len() as u8];
        packet.extend(body);
        packet
    }

    fn split_publish(body: &[u8]) -> (String, Vec<u8>) {
        let len = usize::from(u16::from_be_bytes([body[0], body[1]]));
        let topic = String::from_utf8(body[2..2 + len].to_vec()).unwrap();
        (topic, body[2 + len..].to_vec())
    }

    /// Single-client MQTT 3.1.1 broker reporting every packet it reads
    ///
    /// Acknowledges CONNECT and SUBSCRIBE and follows a SUBACK with one
    /// publish on `obj/in`. With `drop_on_subscribe` it closes the socket
    /// instead of acknowledging the subscription.
    async fn fake_broker(drop_on_subscribe: bool) -> (u16, mpsc::UnboundedReceiver<(u8, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (seen, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            while let Ok((kind, body)) = read_packet(&mut stream).await {
                let _ = seen.send((kind, body.clone()));
                let reply = match kind >> 4 {
                    1 => vec![0x20, 0x02, 0x00, 0x00],
                    8 if drop_on_subscribe => return,
                    8 => {
                        let mut reply = vec![0x90, 0x03, body[0], body[1], 0x00];
                        reply.extend(publish_packet("obj/in", br#"{"value":4.5,"msg":"hi"}"#));
                        reply
                    }
                    12 => vec![0xd0, 0x00],
                    14 => return,
                    _ => continue,
                };
                if stream.write_all(&reply).await.is_err() {
                    return;
                }
            }
        });

        (port, rx)
    }

    /// Next packet of the given type the broker read
    async fn next_packet(seen: &mut mpsc::UnboundedReceiver<(u8, Vec<u8>)>, kind: u8) -> Vec<u8> {
        loop {
            let (packet, body) = timeout(Duration::from_secs(5), seen.recv())
                .await
                .unwrap()
                .unwrap();
            if packet >> 4 == kind {
                return body;
            }
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    /// Client whose event loop is never polled, so its request queue fills up
    fn stalled_client(capacity: usize) -> (MqttClient, EventLoop) {
        let options = MqttOptions::new("stalled", "127.0.0.1", 1883);
        let (client, eventloop) = AsyncClient::new(options, capacity);
        let (incoming, _) = broadcast::channel(1);
        let (_, state) = watch::channel(ConnectionState::Connected);
        let mqtt = MqttClient {
            client,
            incoming,
            state,
            task: tokio::spawn(async {}),
        };
        (mqtt, eventloop)
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let (port, mut seen) = fake_broker(false).await;
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = connects.clone();
        let handlers = ConnectionHandlers::new().on_connect(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let config = MqttConfig::new(format!("tcp://127.0.0.1:{port}")).with_client_id("gw-1");
        let mqtt = MqttClient::connect_with(&config, &Auth::api_key("k3y"), handlers)
            .await
            .unwrap();
        assert!(mqtt.is_connected());
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        let connect = next_packet(&mut seen, 1).await;
        assert!(contains(&connect, b"gw-1"));
        assert!(contains(&connect, b"apikey"));
        assert!(contains(&connect, b"k3y"));

        let mut incoming = mqtt.messages();
        mqtt.subscribe("obj/in", Qos::AtMostOnce).await.unwrap();
        let subscribe = next_packet(&mut seen, 8).await;
        assert!(contains(&subscribe, b"obj/in"));

        let received = timeout(Duration::from_secs(5), incoming.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.topic, "obj/in");
        let message = received.message().unwrap();
        assert_eq!(message.value, 4.5);
        assert_eq!(message.msg, "hi");

        mqtt.publish("obj/out", &Message::new(21.5), Qos::AtMostOnce)
            .await
            .unwrap();
        let (topic, payload) = split_publish(&next_packet(&mut seen, 3).await);
        assert_eq!(topic, "obj/out");
        assert_eq!(payload, br#"{"value":21.5}"#);

        let errors = mqtt
            .publish_all(&[
                MqttMessage::new("obj/a", Message::new(1.0)),
                MqttMessage::new("obj/b", Message::new(2.0).with_msg("two")),
            ])
            .await;
        assert!(errors.is_empty());
        let (topic, _) = split_publish(&next_packet(&mut seen, 3).await);
        assert_eq!(topic, "obj/a");
        let (topic, payload) = split_publish(&next_packet(&mut seen, 3).await);
        assert_eq!(topic, "obj/b");
        assert_eq!(payload, br#"{"value":2.0,"msg":"two"}"#);

        mqtt.disconnect().await.unwrap();
        assert_eq!(mqtt.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_publish_timeout_on_full_queue() {
        let (mqtt, _eventloop) = stalled_client(1);
        let messages = [
            MqttMessage::new("obj/a", Message::new(1.0)),
            MqttMessage::new("obj/b", Message::new(2.0)),
            MqttMessage::new("obj/c", Message::new(3.0)),
        ];

        let errors = mqtt
            .publish_all_timeout(&messages, Duration::from_millis(100))
            .await;
        let errors: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            errors,
            vec![
                "timeout publishing to topic obj/b",
                "timeout publishing to topic obj/c",
            ]
        );

        let err = mqtt
            .publish("obj/d", &Message::new(4.0), Qos::AtLeastOnce)
            .await
            .unwrap_err();
        assert!(matches!(err, LynxError::PublishTimeout(topic) if topic == "obj/d"));
    }

    #[tokio::test]
    async fn test_publish_all_reports_each_failure() {
        let (mqtt, eventloop) = stalled_client(4);
        drop(eventloop);

        let errors = mqtt
            .publish_all(&[
                MqttMessage::new("obj/a", Message::new(1.0)),
                MqttMessage::new("obj/b", Message::new(2.0)),
            ])
            .await;
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], LynxError::Publish { topic, .. } if topic == "obj/a"));
        assert!(errors[1]
            .to_string()
            .starts_with("error publishing to topic obj/b: "));
    }

    #[tokio::test]
    async fn test_connection_lost_callback() {
        let (port, _seen) = fake_broker(true).await;
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        let handlers = ConnectionHandlers::new().on_connection_lost(move |reason| {
            let _ = lost_tx.send(reason.to_string());
        });

        let mut config = MqttConfig::new(format!("tcp://127.0.0.1:{port}"));
        config.auto_reconnect = false;
        let mqtt = MqttClient::connect_with(&config, &Auth::None, handlers)
            .await
            .unwrap();

        // The broker hangs up on the subscription
        mqtt.subscribe("obj/in", Qos::AtLeastOnce).await.unwrap();
        let reason = timeout(Duration::from_secs(5), lost_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!reason.is_empty());

        let mut state = mqtt.state.clone();
        timeout(
            Duration::from_secs(5),
            state.wait_for(|s| matches!(s, ConnectionState::Failed(_))),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!mqtt.is_connected());
    }
}
