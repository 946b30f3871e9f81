//! 单条 RouterOS API 连接
//!
//! 连接本身不做重试，也不做复用：上层每次调用都新建连接，
//! 用完通过 [`ApiConnection::close`] 关闭（见 [`run_scoped`]）。

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::codec::{encode_sentence, read_sentence};
use super::error::{Result, RouterOsError};
use super::reply::{Command, Reply, ReplyKind, Response};

/// 作用域会话里执行的异步闭包返回值
pub type SessionFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>;

pub struct ApiConnection<S> {
    stream: S,
    timeout: Duration,
}

impl<S> ApiConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self { stream, timeout }
    }

    async fn send(&mut self, words: &[String]) -> Result<()> {
        let bytes = encode_sentence(words)?;
        let timeout = self.timeout;
        let stream = &mut self.stream;
        tokio::time::timeout(timeout, async move {
            stream.write_all(&bytes).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| RouterOsError::Timeout(timeout))??;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Reply> {
        let timeout = self.timeout;
        let words = tokio::time::timeout(timeout, read_sentence(&mut self.stream))
            .await
            .map_err(|_| RouterOsError::Timeout(timeout))??;
        trace!(?words, "routeros reply");
        Reply::parse(words)
    }

    /// 执行一条命令，收集所有 `!re` 直到 `!done`
    ///
    /// `!trap` 之后路由器仍会发送 `!done`，这里读完整个回复再返回错误，
    /// 保证连接停在一致的位置。
    pub async fn execute(&mut self, command: &Command) -> Result<Response> {
        debug!(command = command.path(), "routeros command");
        self.send(&command.words()).await?;

        let mut response = Response::default();
        let mut trap: Option<Reply> = None;

        loop {
            let reply = self.receive().await?;
            match reply.kind {
                ReplyKind::Re => response.rows.push(reply.attributes),
                ReplyKind::Empty => {}
                ReplyKind::Trap => {
                    if trap.is_none() {
                        trap = Some(reply);
                    }
                }
                ReplyKind::Fatal => return Err(RouterOsError::Fatal(reply.message())),
                ReplyKind::Done => {
                    if let Some(trap) = trap {
                        return Err(RouterOsError::Trap {
                            message: trap.message(),
                            category: trap.category(),
                        });
                    }
                    response.done = reply.attributes;
                    return Ok(response);
                }
            }
        }
    }

    /// 登录（RouterOS 6.43+ 明文登录）
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let command = Command::new("/login")
            .attr("name", username)
            .attr("password", password);

        match self.execute(&command).await {
            Ok(response) if response.ret().is_some() => Err(RouterOsError::Login(
                "router requested the legacy challenge login (RouterOS < 6.43), which is not supported"
                    .to_string(),
            )),
            Ok(_) => Ok(()),
            Err(RouterOsError::Trap { message, .. }) | Err(RouterOsError::Fatal(message)) => {
                Err(RouterOsError::Login(message))
            }
            Err(e) => Err(e),
        }
    }

    /// 关闭连接，所有错误都忽略
    pub async fn close(mut self) {
        // /quit 之后路由器回 !fatal 并断开，不需要等待
        let _ = self.send(&["/quit".to_string()]).await;
        let _ = tokio::time::timeout(self.timeout, self.stream.shutdown()).await;
    }
}

/// 在连接上执行闭包，无论成功失败都关闭连接
pub async fn run_scoped<S, T, F>(mut conn: ApiConnection<S>, f: F) -> Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    F: for<'c> FnOnce(&'c mut ApiConnection<S>) -> SessionFuture<'c, T>,
{
    let result = f(&mut conn).await;
    conn.close().await;
    result
}
