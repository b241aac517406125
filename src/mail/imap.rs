//! Blocking IMAP client over TLS.
//!
//! Speaks just enough IMAP4rev1 for the miner: LOGIN, EXAMINE (read-only
//! select), SEARCH, FETCH RFC822 and LOGOUT. Run it inside
//! `tokio::task::spawn_blocking` from async code.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use rustls::{ClientConnection, StreamOwned};
use rustls_pki_types::ServerName;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::config::ParserConfig;
use crate::error::MailError;
use crate::mail::{MailSession, MessageHandle, SearchCriterion, quote};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// Lines and literals collected for one tagged command.
#[derive(Debug, Default)]
struct Response {
    /// Untagged response lines, without CRLF.
    lines: Vec<String>,
    /// `{N}` literals in the order they arrived.
    literals: Vec<Vec<u8>>,
}

/// An authenticated, read-only IMAP session.
pub struct ImapSession {
    stream: BufReader<TlsStream>,
    next_tag: u32,
    logged_out: bool,
}

impl ImapSession {
    /// Connect, authenticate and open the configured mailbox read-only.
    pub fn open(config: &ParserConfig) -> Result<Self, MailError> {
        let host = config.host.imap_domain();
        let password = config.passwd.as_ref().ok_or_else(|| MailError::Auth {
            user: config.addr.clone(),
        })?;

        let mut session = Self::connect(host, config.imap_port)?;
        session.login(&config.addr, password)?;
        session.examine(&config.mailbox)?;
        info!(host, mailbox = %config.mailbox, "Opened mailbox read-only");
        Ok(session)
    }

    /// Open a TLS connection and consume the server greeting.
    pub fn connect(host: &str, port: u16) -> Result<Self, MailError> {
        let tcp = TcpStream::connect((host, port)).map_err(|source| MailError::Connect {
            host: host.to_string(),
            port,
            source,
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
        );
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| MailError::ServerName(format!("{host}: {e}")))?;
        let conn = ClientConnection::new(tls_config, server_name)?;

        let mut session = Self {
            stream: BufReader::new(StreamOwned::new(conn, tcp)),
            next_tag: 1,
            logged_out: false,
        };

        let greeting = read_line(&mut session.stream)?;
        if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
            session.logged_out = true;
            return Err(MailError::Protocol(format!(
                "unexpected greeting: {}",
                greeting.trim_end()
            )));
        }
        debug!(host, port, "IMAP greeting received");
        Ok(session)
    }

    pub fn login(&mut self, user: &str, password: &SecretString) -> Result<(), MailError> {
        let command = format!("LOGIN {} {}", quote(user), quote(password.expose_secret()));
        self.command(&command)
            .map(|_| ())
            .map_err(|e| login_error(user, e))
    }

    /// Select a mailbox without permission to change flags.
    pub fn examine(&mut self, mailbox: &str) -> Result<(), MailError> {
        self.command(&format!("EXAMINE {}", quote(mailbox)))?;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), MailError> {
        if self.logged_out {
            return Ok(());
        }
        self.logged_out = true;
        self.command("LOGOUT")?;
        Ok(())
    }

    fn next_tag(&mut self) -> String {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;
        tag
    }

    /// Send a command and collect everything up to its tagged completion.
    fn command(&mut self, command: &str) -> Result<Response, MailError> {
        let tag = self.next_tag();
        let verb = command.split_whitespace().next().unwrap_or(command);

        let writer = self.stream.get_mut();
        writer.write_all(format!("{tag} {command}\r\n").as_bytes())?;
        writer.flush()?;

        read_response(&mut self.stream, &tag, verb)
    }
}

/// A LOGIN the server refused is an authentication failure, not a command error.
fn login_error(user: &str, error: MailError) -> MailError {
    match error {
        MailError::Command { .. } => MailError::Auth {
            user: user.to_string(),
        },
        other => other,
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String, MailError> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(MailError::Protocol("connection closed by server".into()));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Collect untagged lines and literals until the line tagged `tag`.
///
/// A `{N}` literal is read as exactly `N` bytes, CRLFs included. A tagged
/// `NO` or `BAD` becomes [`MailError::Command`] naming `verb`.
fn read_response<R: BufRead>(
    reader: &mut R,
    tag: &str,
    verb: &str,
) -> Result<Response, MailError> {
    let mut response = Response::default();
    loop {
        let line = read_line(reader)?;

        if let Some(len) = literal_len(&line) {
            let mut literal = vec![0u8; len];
            reader.read_exact(&mut literal)?;
            response.literals.push(literal);
            response.lines.push(line.trim_end().to_string());
            continue;
        }

        if let Some(status) = line.strip_prefix(tag).filter(|s| s.starts_with(' ')) {
            let status = status.trim();
            if status.starts_with("OK") {
                return Ok(response);
            }
            return Err(MailError::Command {
                command: verb.to_string(),
                response: status.to_string(),
            });
        }

        response.lines.push(line.trim_end().to_string());
    }
}

/// Size of a `{N}` literal announced at the end of a response line.
fn literal_len(line: &str) -> Option<usize> {
    let line = line.trim_end_matches(['\r', '\n']);
    let open = line.rfind('{')?;
    let inner = line[open + 1..].strip_suffix('}')?;
    inner.parse().ok()
}

/// Sequence numbers from `* SEARCH ...` lines.
fn parse_search(lines: &[String]) -> Vec<MessageHandle> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("* SEARCH"))
        .flat_map(str::split_whitespace)
        .map(|n| MessageHandle(n.to_string()))
        .collect()
}

impl MailSession for ImapSession {
    fn search(&mut self, criterion: &SearchCriterion) -> Result<Vec<MessageHandle>, MailError> {
        let response = self.command(&format!("SEARCH {}", criterion.to_imap()))?;
        let handles = parse_search(&response.lines);
        debug!(count = handles.len(), "IMAP search complete");
        Ok(handles)
    }

    fn fetch(&mut self, handle: &MessageHandle) -> Result<Option<Vec<u8>>, MailError> {
        let mut response = self.command(&format!("FETCH {handle} RFC822"))?;
        if response.literals.is_empty() {
            return Ok(None);
        }
        Ok(Some(response.literals.swap_remove(0)))
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if let Err(e) = self.logout() {
            warn!("IMAP logout failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn response_reads_literal_exactly() {
        let wire: &[u8] = b"* 1 FETCH (RFC822 {5}\r\nab\r\nc)\r\nA1 OK done\r\n";
        let mut reader = Cursor::new(wire);
        let response = read_response(&mut reader, "A1", "FETCH").unwrap();

        assert_eq!(response.literals, vec![b"ab\r\nc".to_vec()]);
        assert_eq!(response.lines, vec!["* 1 FETCH (RFC822 {5}", ")"]);
    }

    #[test]
    fn response_collects_untagged_lines_until_own_tag() {
        let mut reader = Cursor::new(
            &b"* SEARCH 2 4\r\nA10 OK not ours\r\nA1 OK SEARCH completed\r\n"[..],
        );
        let response = read_response(&mut reader, "A1", "SEARCH").unwrap();

        assert!(response.literals.is_empty());
        assert_eq!(response.lines, vec!["* SEARCH 2 4", "A10 OK not ours"]);
    }

    #[test]
    fn tagged_no_is_a_command_error() {
        let mut reader = Cursor::new(&b"A1 NO denied\r\n"[..]);
        match read_response(&mut reader, "A1", "EXAMINE") {
            Err(MailError::Command { command, response }) => {
                assert_eq!(command, "EXAMINE");
                assert_eq!(response, "NO denied");
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn tagged_bad_is_a_command_error() {
        let mut reader = Cursor::new(&b"A3 BAD parse error\r\n"[..]);
        assert!(matches!(
            read_response(&mut reader, "A3", "SEARCH"),
            Err(MailError::Command { .. })
        ));
    }

    #[test]
    fn eof_before_tagged_line_is_a_protocol_error() {
        let mut reader = Cursor::new(&b"* OK still working\r\n"[..]);
        assert!(matches!(
            read_response(&mut reader, "A1", "FETCH"),
            Err(MailError::Protocol(_))
        ));
    }

    #[test]
    fn truncated_literal_is_an_io_error() {
        let mut reader = Cursor::new(&b"* 1 FETCH (RFC822 {10}\r\nshort"[..]);
        assert!(matches!(
            read_response(&mut reader, "A1", "FETCH"),
            Err(MailError::Io(_))
        ));
    }

    #[test]
    fn rejected_login_becomes_auth_error() {
        let refused = MailError::Command {
            command: "LOGIN".into(),
            response: "NO [AUTHENTICATIONFAILED] Invalid credentials".into(),
        };
        match login_error("dev@example.com", refused) {
            MailError::Auth { user } => assert_eq!(user, "dev@example.com"),
            other => panic!("expected Auth error, got {other:?}"),
        }

        let closed = MailError::Protocol("connection closed by server".into());
        assert!(matches!(
            login_error("dev@example.com", closed),
            MailError::Protocol(_)
        ));
    }

    #[test]
    fn literal_len_detects_fetch_literal() {
        assert_eq!(literal_len("* 12 FETCH (RFC822 {2048}\r\n"), Some(2048));
        assert_eq!(literal_len("* 12 FETCH (RFC822 {0}"), Some(0));
    }

    #[test]
    fn literal_len_ignores_plain_lines() {
        assert_eq!(literal_len("* OK [READ-ONLY] EXAMINE completed\r\n"), None);
        assert_eq!(literal_len("* FLAGS (\\Seen {weird})\r\n"), None);
        assert_eq!(literal_len(")\r\n"), None);
    }

    #[test]
    fn parse_search_collects_sequence_numbers() {
        let lines = vec![
            "* SEARCH 3 7 12".to_string(),
            "* OK still here".to_string(),
        ];
        let handles = parse_search(&lines);
        assert_eq!(
            handles,
            vec![
                MessageHandle("3".into()),
                MessageHandle("7".into()),
                MessageHandle("12".into()),
            ]
        );
    }

    #[test]
    fn parse_search_empty_result() {
        let lines = vec!["* SEARCH".to_string()];
        assert!(parse_search(&lines).is_empty());
    }
}
