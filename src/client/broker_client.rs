//! Client library
//!
//! `BrokerClient` speaks the framed protocol from the client side. It is
//! what the `publish`/`consume` subcommands use, and it is handy for tests.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), routemq::utils::error::ClientError> {
//! use routemq::client::BrokerClient;
//! use routemq::protocol::ServerMessage;
//!
//! let mut consumer = BrokerClient::connect("127.0.0.1:5671").await?;
//! consumer.declare("orders", "broadcast", false).await?;
//!
//! let mut producer = BrokerClient::connect("127.0.0.1:5671").await?;
//! producer.publish("orders", "hello").await?;
//!
//! if let ServerMessage::Delivery(envelope) = consumer.next_message().await? {
//!     println!("{:?}", envelope.body);
//! }
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::protocol::{
    ClientMessage, ConsumerRegistration, Envelope, FrameReader, QueueDescriptor, ServerMessage,
    parse_server, write_frame,
};
use crate::utils::error::ClientError;

pub struct BrokerClient<S = TcpStream> {
    reader: FrameReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl BrokerClient<TcpStream> {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }
}

impl<S: AsyncRead + AsyncWrite> BrokerClient<S> {
    pub fn from_stream(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(reader),
            writer,
        }
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let payload = serde_json::to_vec(message)?;
        self.send_raw(&payload).await
    }

    /// Write an arbitrary payload as one frame.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        write_frame(&mut self.writer, payload).await?;
        Ok(())
    }

    /// Declare a route; the broker also registers this connection as a
    /// consumer of it.
    pub async fn declare(
        &mut self,
        name: &str,
        kind: &str,
        durable: bool,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::Queue(QueueDescriptor {
            name: name.to_string(),
            kind: kind.to_string(),
            durable,
        }))
        .await
    }

    pub async fn consume(
        &mut self,
        route: &str,
        stream_id: Option<String>,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::Consumer(ConsumerRegistration {
            route: route.to_string(),
            stream_id,
        }))
        .await
    }

    pub async fn publish(
        &mut self,
        route: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::Publish(Envelope::new(route, body)))
            .await
    }

    /// Wait for the next delivery or error report from the broker.
    pub async fn next_message(&mut self) -> Result<ServerMessage, ClientError> {
        let payload = self.reader.next_frame().await?;
        Ok(parse_server(&payload)?)
    }
}
