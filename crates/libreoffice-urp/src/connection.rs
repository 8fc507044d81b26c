//! A live bridge to LibreOffice: protocol negotiation, remote calls and the
//! UNO bootstrap sequence.

use std::cmp::Ordering;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::codec::Encoder;
use crate::error::{Result, UrpError};
use crate::framing::BlockStream;
use crate::message::{Inbound, Message, Outbound, Reply, Request, RequestHead};
use crate::methods::names::*;
use crate::methods::{
    x_component_context, x_interface, x_multi_component_factory, x_protocol_properties, Method,
    Param,
};
use crate::types::{Type, TypeClass, UnoException, UnoValue};

pub const PROTOCOL_OID: &str = "UrpProtocolProperties";
pub const PROTOCOL_TID: &[u8] = b".UrpProtocolPropertiesTid";

/// Function id of the one-way `release` the peer sends for proxies it drops.
const RELEASE: u16 = 2;

/// A remote object, addressed through one of its interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub oid: String,
    pub interface: Type,
}

impl ObjectRef {
    pub fn new(oid: impl Into<String>, interface: &str) -> Self {
        Self {
            oid: oid.into(),
            interface: Type::interface(interface),
        }
    }
}

/// Objects obtained while bootstrapping a session.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub context: ObjectRef,
    pub service_manager: ObjectRef,
    /// The desktop, typed as `XComponentLoader`.
    pub desktop: ObjectRef,
}

pub struct UrpConnection<S = TcpStream> {
    blocks: BlockStream<S>,
    inbound: Inbound,
    outbound: Outbound,
    tid: Vec<u8>,
    current_context: bool,
}

impl UrpConnection<TcpStream> {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(host, port, "bridge socket connected");
        Self::handshake(stream).await
    }
}

impl<S> UrpConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established byte stream and run protocol negotiation on it.
    pub async fn handshake(io: S) -> Result<Self> {
        let mut conn = Self {
            blocks: BlockStream::new(io),
            inbound: Inbound::new(),
            outbound: Outbound::new(),
            tid: format!("writer-bridge-{:016x}", rand::random::<u64>()).into_bytes(),
            current_context: false,
        };
        conn.negotiate().await?;
        tracing::debug!(current_context = conn.current_context, "bridge negotiated");
        Ok(conn)
    }

    /// Whether every request carries a (null) current context.
    pub fn current_context_mode(&self) -> bool {
        self.current_context
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.blocks.shutdown().await
    }

    async fn next_message(&mut self) -> Result<Message> {
        let data = self.blocks.recv().await?;
        self.inbound.decode(data)
    }

    async fn send_reply(&mut self, tid: &[u8], exception: bool, body: &[u8]) -> Result<()> {
        let msg = self.outbound.reply(tid, exception, body);
        self.blocks.send(&msg).await
    }

    async fn send_protocol(&mut self, method: &Method, body: &[u8]) -> Result<()> {
        let interface = Type::interface(X_PROTOCOL_PROPERTIES);
        let head = RequestHead {
            function: method.index,
            interface: &interface,
            oid: PROTOCOL_OID,
            tid: PROTOCOL_TID,
            must_reply: true,
        };
        let msg = self.outbound.request(&head, body);
        self.blocks.send(&msg).await
    }

    /// Both sides may open with `requestChange`; the larger random number
    /// wins and the winner commits. We only ask for current-context mode.
    async fn negotiate(&mut self) -> Result<()> {
        let ours: i32 = rand::random();
        let mut body = BytesMut::new();
        Encoder::new(&mut body).value(&UnoValue::Long(ours), &Type::long())?;
        self.send_protocol(&x_protocol_properties::REQUEST_CHANGE, &body)
            .await?;

        loop {
            match self.next_message().await? {
                Message::Reply(reply) if reply.tid == PROTOCOL_TID => {
                    if reply.exception {
                        tracing::debug!("peer declined protocol properties");
                        return Ok(());
                    }
                    let mut body = reply.body;
                    let verdict = self.inbound.decoder(&mut body).value(&Type::long())?;
                    return match verdict.as_i64() {
                        Some(1) => self.commit().await,
                        Some(0) => self.await_commit().await,
                        other => {
                            tracing::debug!(?other, "negotiation tied; staying in plain mode");
                            Ok(())
                        }
                    };
                }
                Message::Request(req) if req.oid == PROTOCOL_OID => {
                    if req.function == x_protocol_properties::REQUEST_CHANGE.index {
                        let mut body = req.body.clone();
                        let theirs = self
                            .inbound
                            .decoder(&mut body)
                            .value(&Type::long())?
                            .as_i64()
                            .unwrap_or(0);
                        let verdict = match i64::from(ours).cmp(&theirs) {
                            Ordering::Greater => 0,
                            Ordering::Less => 1,
                            Ordering::Equal => -1,
                        };
                        let mut reply = BytesMut::new();
                        Encoder::new(&mut reply).value(&UnoValue::Long(verdict), &Type::long())?;
                        self.send_reply(&req.tid, false, &reply).await?;
                        if verdict == 1 {
                            return self.await_commit().await;
                        }
                    } else if req.function == x_protocol_properties::COMMIT_CHANGE.index {
                        self.send_reply(&req.tid, false, &[]).await?;
                        self.current_context = true;
                        return Ok(());
                    } else {
                        self.answer_incoming(req).await?;
                    }
                }
                Message::Reply(reply) => {
                    tracing::warn!(tid = %String::from_utf8_lossy(&reply.tid), "unexpected reply during negotiation");
                }
                Message::Request(req) => self.answer_incoming(req).await?,
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let properties = UnoValue::Sequence(vec![UnoValue::Struct(vec![
            UnoValue::from("CurrentContext"),
            UnoValue::any(Type::void(), UnoValue::Void),
        ])]);
        let mut body = BytesMut::new();
        Encoder::new(&mut body).value(&properties, &Type::sequence_of(PROTOCOL_PROPERTY))?;
        self.send_protocol(&x_protocol_properties::COMMIT_CHANGE, &body)
            .await?;

        loop {
            match self.next_message().await? {
                Message::Reply(reply) if reply.tid == PROTOCOL_TID => {
                    self.current_context = !reply.exception;
                    if reply.exception {
                        tracing::warn!("peer rejected commitChange");
                    }
                    return Ok(());
                }
                Message::Reply(_) => {}
                Message::Request(req) => self.answer_incoming(req).await?,
            }
        }
    }

    async fn await_commit(&mut self) -> Result<()> {
        loop {
            match self.next_message().await? {
                Message::Request(req)
                    if req.oid == PROTOCOL_OID
                        && req.function == x_protocol_properties::COMMIT_CHANGE.index =>
                {
                    self.send_reply(&req.tid, false, &[]).await?;
                    self.current_context = true;
                    return Ok(());
                }
                Message::Request(req) => self.answer_incoming(req).await?,
                Message::Reply(_) => tracing::trace!("ignoring reply while awaiting commitChange"),
            }
        }
    }

    /// We export no objects, so calls from the peer can only be refused.
    async fn answer_incoming(&mut self, req: Request) -> Result<()> {
        if req.function == RELEASE || !req.must_reply {
            return Ok(());
        }
        tracing::debug!(oid = %req.oid, function = req.function, "refusing call from peer");
        let refusal = UnoValue::any(
            Type::named(TypeClass::Exception, "com.sun.star.uno.RuntimeException"),
            UnoValue::Exception(UnoException {
                type_name: "com.sun.star.uno.RuntimeException".into(),
                message: "this bridge does not serve objects".into(),
            }),
        );
        let mut body = BytesMut::new();
        Encoder::new(&mut body).value(&refusal, &Type::any())?;
        self.send_reply(&req.tid, true, &body).await
    }

    async fn await_reply(&mut self) -> Result<Reply> {
        loop {
            match self.next_message().await? {
                Message::Reply(reply) if reply.tid == self.tid => return Ok(reply),
                Message::Reply(reply) => {
                    tracing::warn!(tid = %String::from_utf8_lossy(&reply.tid), "dropping reply for a foreign thread id");
                }
                Message::Request(req) => self.answer_incoming(req).await?,
            }
        }
    }

    /// Invoke `method` on `target` and wait for its result.
    pub async fn call(
        &mut self,
        target: &ObjectRef,
        method: &Method,
        args: &[UnoValue],
    ) -> Result<UnoValue> {
        if args.len() != method.params.len() {
            return Err(UrpError::Protocol(format!(
                "{}() takes {} arguments, got {}",
                method.name,
                method.params.len(),
                args.len()
            )));
        }

        let with_context = self.current_context;
        let mut body = BytesMut::with_capacity(128);
        {
            let mut enc = self.outbound.encoder(&mut body);
            if with_context {
                enc.interface("");
            }
            for (arg, param) in args.iter().zip(method.params) {
                enc.value(arg, &param.to_type())?;
            }
        }

        tracing::trace!(method = method.name, oid = %target.oid, "urp call");
        let head = RequestHead {
            function: method.index,
            interface: &target.interface,
            oid: &target.oid,
            tid: &self.tid,
            must_reply: true,
        };
        let msg = self.outbound.request(&head, &body);
        self.blocks.send(&msg).await?;

        let reply = self.await_reply().await?;
        let mut body = reply.body;
        if reply.exception {
            let raised = self.inbound.decoder(&mut body).value(&Type::any())?;
            return Err(remote_exception(raised));
        }
        self.inbound
            .decoder(&mut body)
            .value(&method.returns.to_type())
    }

    /// Call a method that yields an object and wrap the reference.
    ///
    /// The interface of the result is taken from the `Any` it arrived in,
    /// else from the method's declared return type.
    pub async fn call_object(
        &mut self,
        target: &ObjectRef,
        method: &Method,
        args: &[UnoValue],
    ) -> Result<ObjectRef> {
        let value = self.call(target, method, args).await?;
        object_from(&value, method.returns).ok_or(UrpError::NullReference(method.name))
    }

    pub async fn query_interface(
        &mut self,
        target: &ObjectRef,
        interface: &str,
    ) -> Result<Option<ObjectRef>> {
        let found = self
            .call(
                target,
                &x_interface::QUERY_INTERFACE,
                &[UnoValue::Type(Type::interface(interface))],
            )
            .await?;
        Ok(found.oid().map(|oid| ObjectRef::new(oid, interface)))
    }

    /// Like [`query_interface`](Self::query_interface), failing when the
    /// object lacks the interface.
    pub async fn require(&mut self, target: &ObjectRef, interface: &str) -> Result<ObjectRef> {
        self.query_interface(target, interface)
            .await?
            .ok_or_else(|| UrpError::Unsupported {
                oid: target.oid.clone(),
                interface: interface.to_owned(),
            })
    }

    /// Resolve the component context, service manager and desktop.
    pub async fn bootstrap(&mut self) -> Result<Bootstrap> {
        let initial = ObjectRef::new("StarOffice.ComponentContext", X_INTERFACE);
        let context = self.require(&initial, X_COMPONENT_CONTEXT).await?;
        let service_manager = self
            .call_object(&context, &x_component_context::GET_SERVICE_MANAGER, &[])
            .await?;
        let desktop = self
            .call_object(
                &service_manager,
                &x_multi_component_factory::CREATE_INSTANCE_WITH_CONTEXT,
                &[
                    UnoValue::from("com.sun.star.frame.Desktop"),
                    UnoValue::Interface(context.oid.clone()),
                ],
            )
            .await?;
        let desktop = self.require(&desktop, X_COMPONENT_LOADER).await?;
        tracing::info!(desktop = %desktop.oid, "office bootstrap complete");
        Ok(Bootstrap {
            context,
            service_manager,
            desktop,
        })
    }
}

fn object_from(value: &UnoValue, declared: Param) -> Option<ObjectRef> {
    let oid = value.oid()?;
    let interface = match value {
        UnoValue::Any(any) if any.type_desc.class == TypeClass::Interface => {
            any.type_desc.name.as_str()
        }
        _ => match declared {
            Param::Interface(name) => name,
            _ => X_INTERFACE,
        },
    };
    Some(ObjectRef::new(oid, interface))
}

fn remote_exception(raised: UnoValue) -> UrpError {
    match raised.unwrap_any() {
        UnoValue::Exception(exc) => UrpError::RemoteException {
            type_name: exc.type_name.clone(),
            message: exc.message.clone(),
        },
        other => UrpError::RemoteException {
            type_name: "unknown".into(),
            message: format!("{other:?}"),
        },
    }
}
