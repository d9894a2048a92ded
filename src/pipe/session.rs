use crate::error::Error;
use crate::pipe::question::Question;
use crate::service::SharedService;
use crate::zone::ZoneRecords;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELO: &str = "HELO";
const ABI_VERSION: &str = "1";
const DEBUGQUIT: &str = "DEBUGQUIT";

/// Serves one pipe backend conversation over a reader/writer pair.
///
/// A session holds no state between questions: every `Q` is answered from a freshly
/// synthesized zone.
#[derive(Clone)]
pub struct PipeSession {
    service: SharedService,
    banner: String,
}

impl PipeSession {
    #[must_use]
    pub fn new(service: SharedService, banner: impl Into<String>) -> Self {
        Self {
            service,
            banner: banner.into(),
        }
    }

    /// Run the handshake and then answer questions until `DEBUGQUIT` or end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] after replying `FAIL` to a bad handshake, and
    /// [`Error::IO`] if the streams fail.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), Error>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        reader.read_until(b'\n', &mut buf).await?;
        if let Err(err) = Self::check_handshake(&String::from_utf8_lossy(&buf)) {
            send(&mut writer, "FAIL", None).await?;
            return Err(err);
        }
        send(&mut writer, "OK", Some(&self.banner)).await?;
        tracing::debug!("pipe session started");

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                tracing::debug!("pipe session input closed");
                return Ok(());
            }
            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::debug!("skipping line that isn't valid UTF-8");
                continue;
            };

            let question = match Question::parse(line) {
                Ok(question) => question,
                Err(_) if line.starts_with(DEBUGQUIT) => {
                    tracing::debug!("pipe session ended by {DEBUGQUIT}");
                    return Ok(());
                }
                Err(err) => {
                    tracing::debug!("skipping line: {err}");
                    continue;
                }
            };
            self.answer(&question, &mut writer).await?;
        }
    }

    fn check_handshake(line: &str) -> Result<(), Error> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[..] {
            [HELO, ABI_VERSION] => Ok(()),
            _ => Err(Error::ProtocolViolation(format!(
                "expected \"{HELO} {ABI_VERSION}\", got {:?}",
                line.trim_end()
            ))),
        }
    }

    async fn answer<W>(&self, question: &Question<'_>, writer: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::trace!(
            qname = question.qname,
            qclass = question.qclass,
            qtype = question.qtype,
            id = question.id,
            remote_ip = question.remote_ip,
            "question {}",
            question.question_type
        );
        if !question.is_query() {
            return send(writer, "END", None).await;
        }

        let zone: ZoneRecords = match self.service.zone().await {
            Ok(zone) => zone,
            Err(err) => {
                tracing::error!("unable to answer {} {}: {err}", question.qname, question.qtype);
                return send(writer, "FAIL", None).await;
            }
        };
        for record in zone.answers(question.qname, question.qtype) {
            let data = format!(
                "{}\tIN\t{}\t{}\t1\t{}",
                question.qname, record.record_type, record.ttl, record.content
            );
            send(writer, "DATA", Some(&data)).await?;
        }
        send(writer, "END", None).await
    }
}

/// Write one reply line and flush it: the DNS server blocks on each reply.
async fn send<W>(writer: &mut W, tag: &str, data: Option<&str>) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let line = match data {
        Some(data) => format!("{tag}\t{data}\n"),
        None => format!("{tag}\n"),
    };
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
