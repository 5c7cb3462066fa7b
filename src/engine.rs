use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::clock::Sample;
use crate::codec;
use crate::config::{self, RunConfig};
use crate::error::{LoadGenError, Result};
use crate::input::{self, parse_directive, parse_query, DirectiveError, DirectiveName, InputStream, LineKind};
use crate::stats::{RunSummary, Stats};
use crate::stop::{AdmissionDecision, RunPhase, StopPredicate, StopReason};
use crate::table::{InFlightTable, ReleaseOutcome};

const MAX_UDP_MESSAGE: usize = 512;
/// Bound on the single blocking receive wait when the in-flight pool is
/// full and the engine cannot usefully send anyway (§4.F/§5).
const BLOCKING_POLL: Duration = Duration::from_millis(100);

/// The in-flight query engine (§2, component F). Owns the socket, the
/// in-flight table, the input stream, and the configuration; exposes no
/// shared mutable state, matching the single-owner model in §3/§5.
pub struct Engine {
    socket: UdpSocket,
    server: SocketAddr,
    table: InFlightTable,
    input: InputStream,
    stop: StopPredicate,
    stats: Stats,

    ignore_directives: bool,
    timeout: Duration,
    server_from_cli: bool,
    port_from_cli: bool,
    max_queries_from_cli: bool,
    timeout_from_cli: bool,
    run_once: bool,
    time_limit: Option<Duration>,

    next_id: u16,
    phase: RunPhase,
    eof: bool,
    program_start: Sample,
    first_query_at: Option<Instant>,
}

impl Engine {
    pub async fn setup(config: &RunConfig) -> Result<Self> {
        let server = config.resolve_server().await?;

        let input = input::open_input(config.data_file.as_ref()).map_err(|e| LoadGenError::DataFileOpen {
            path: config
                .data_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<stdin>".to_string()),
            source: std::sync::Arc::new(e),
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| LoadGenError::SocketBind(std::sync::Arc::new(e)))?;
        socket.connect(server).await.map_err(|e| LoadGenError::SocketBind(std::sync::Arc::new(e)))?;
        set_buffer_sizes(&socket, config.socket_buffer_kb);

        let stop = StopPredicate::new(config.time_limit, config.run_once);

        Ok(Self {
            socket,
            server,
            table: InFlightTable::new(config.max_queries),
            input,
            stop,
            stats: Stats::default(),
            ignore_directives: config.ignore_directives,
            timeout: config.timeout,
            server_from_cli: config.server_from_cli,
            port_from_cli: config.port_from_cli,
            max_queries_from_cli: config.max_queries_from_cli,
            timeout_from_cli: config.timeout_from_cli,
            run_once: config.run_once,
            time_limit: config.time_limit,
            next_id: 0,
            phase: RunPhase::Setup,
            eof: false,
            program_start: Sample::now(),
            first_query_at: None,
        })
    }

    /// Runs the admit → dispatch → poll → expire loop to completion
    /// (§4.F) and returns the data the Reporter needs.
    pub async fn run(mut self) -> RunSummary {
        self.program_start = Sample::now();

        loop {
            self.admit_while_possible().await;
            self.expire_old();
            self.drain_responses().await;

            if self.stop.is_stopped() && self.table.outstanding() == 0 {
                break;
            }
        }

        let end_of_run = Sample::now();
        RunSummary {
            stats: self.stats,
            runs_through_file: self.stop.runs_through_file(),
            stopped_by_time_limit: self.stop.reason() == Some(StopReason::TimeLimit),
            run_once: self.run_once,
            time_limit: self.time_limit,
            program_start: self.program_start,
            end_of_run,
        }
    }

    async fn admit_while_possible(&mut self) {
        loop {
            if self.table.outstanding() >= self.table.limit() {
                return;
            }

            match self.stop.decide(
                self.eof,
                self.phase,
                self.program_start.monotonic,
                self.first_query_at,
            ) {
                AdmissionDecision::Stop => return,
                AdmissionDecision::Rewind => {
                    if let Err(e) = self.input.rewind() {
                        warn!("cannot repeat input: {e}");
                        return;
                    }
                    self.eof = false;
                }
                AdmissionDecision::Admit => match self.input.next_line() {
                    Ok(LineKind::Eof) => self.eof = true,
                    Ok(LineKind::Directive(text)) => {
                        if self.ignore_directives {
                            debug!("ignoring directive (-n set): {text}");
                        } else {
                            self.apply_directive(&text).await;
                        }
                    }
                    Ok(LineKind::Query(text)) => self.admit(&text).await,
                    Err(e) => {
                        warn!("error reading input: {e}");
                        self.eof = true;
                    }
                },
            }
        }
    }

    /// §4.F admit(). The id is only allocated after the line parses
    /// successfully (§9 design note): a malformed query line is skipped
    /// without consuming an id or a slot.
    async fn admit(&mut self, line: &str) {
        let (name, qtype) = match parse_query(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let packet = match codec::encode(id, &name, qtype) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };

        let now = Instant::now();
        self.table
            .reserve(id, now)
            .expect("reserve is only called when outstanding < limit");

        if let Err(e) = self.socket.send(&packet).await {
            warn!("send failed: {e}");
            // Undo the reservation: otherwise the slot leaks until it
            // eventually times out for a query that was never sent (§4.F).
            self.table.release(id);
            return;
        }

        if self.phase == RunPhase::Setup {
            self.phase = RunPhase::Running;
            self.first_query_at = Some(now);
            info!("[Status] Sending queries");
        }

        self.stats.sent_count += 1;
    }

    /// §4.F drain_responses(). Blocks up to 100ms only when the pool is
    /// full and sending is therefore not an option; otherwise polls
    /// non-blocking so the sender is never starved.
    async fn drain_responses(&mut self) {
        let mut buf = [0u8; MAX_UDP_MESSAGE];
        let could_send_more = self.table.outstanding() < self.table.limit();

        if could_send_more {
            self.drain_nonblocking(&mut buf);
            return;
        }

        match tokio::time::timeout(BLOCKING_POLL, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                self.handle_datagram(&buf[..n]);
                self.drain_nonblocking(&mut buf);
            }
            Ok(Err(e)) => warn!("recv error: {e}"),
            Err(_elapsed) => {}
        }
    }

    fn drain_nonblocking(&mut self, buf: &mut [u8; MAX_UDP_MESSAGE]) {
        loop {
            match self.socket.try_recv(buf) {
                Ok(n) => self.handle_datagram(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("recv error: {e}");
                    break;
                }
            }
        }
    }

    fn handle_datagram(&mut self, bytes: &[u8]) {
        match codec::extract_id(bytes) {
            None => warn!("received a datagram too short to carry a transaction id"),
            Some(id) => match self.table.release(id) {
                ReleaseOutcome::Found => self.stats.completed_count += 1,
                ReleaseOutcome::NotFound => {
                    warn!("stray response: id {id} does not match any outstanding query")
                }
            },
        }
    }

    /// §4.F expire_old(). Captures `now` once so every slot in this call
    /// is judged against the same instant (§4.B).
    fn expire_old(&mut self) {
        let now = Instant::now();
        for id in self.table.expire(now, self.timeout) {
            self.stats.timed_out_count += 1;
            warn!("[Timeout] Query timed out: msg id {id}");
        }
    }

    /// §4.F apply_directive(). During setup, a directive is rejected if
    /// the command line already set the same option; outside setup it
    /// always applies (§4.F).
    async fn apply_directive(&mut self, text: &str) {
        let directive = match parse_directive(text) {
            Ok(d) => d,
            Err(DirectiveError::Empty) => {
                warn!("empty directive line");
                return;
            }
            Err(e) => {
                warn!("{e}");
                return;
            }
        };

        if !directive.trailing.is_empty() {
            warn!("trailing garbage in directive: {:?}", directive.trailing);
        }

        if self.phase == RunPhase::Setup {
            let overridden_by_cli = match directive.name {
                DirectiveName::Server => self.server_from_cli,
                DirectiveName::Port => self.port_from_cli,
                DirectiveName::MaxQueries => self.max_queries_from_cli,
                DirectiveName::MaxWait => self.timeout_from_cli,
            };
            if overridden_by_cli {
                warn!("directive '{:?}' overridden by command line", directive.name);
                return;
            }
        }

        match directive.name {
            DirectiveName::Server => self.apply_server_directive(&directive.value).await,
            DirectiveName::Port => self.apply_port_directive(&directive.value).await,
            DirectiveName::MaxQueries => self.apply_max_queries_directive(&directive.value),
            DirectiveName::MaxWait => self.apply_max_wait_directive(&directive.value),
        }
    }

    async fn apply_server_directive(&mut self, host: &str) {
        match config::resolve(host, self.server.port()).await {
            Ok(addr) => {
                self.server = addr;
                if let Err(e) = self.socket.connect(addr).await {
                    warn!("failed to redirect socket to {addr}: {e}");
                }
            }
            Err(e) => warn!("server directive rejected: {e}"),
        }
    }

    async fn apply_port_directive(&mut self, value: &str) {
        match value.parse::<u32>() {
            Ok(port) if port > 0 && port <= 65535 => {
                self.server.set_port(port as u16);
                if let Err(e) = self.socket.connect(self.server).await {
                    warn!("failed to redirect socket to {}: {e}", self.server);
                }
            }
            _ => warn!("port directive rejected: '{value}' is not a valid port"),
        }
    }

    fn apply_max_queries_directive(&mut self, value: &str) {
        match value.parse::<usize>() {
            Ok(limit) if limit > 0 => self.table.resize(limit),
            _ => warn!("maxqueries directive rejected: '{value}' is not a positive integer"),
        }
    }

    fn apply_max_wait_directive(&mut self, value: &str) {
        match value.parse::<u64>() {
            Ok(secs) if secs > 0 => self.timeout = Duration::from_secs(secs),
            _ => warn!("maxwait directive rejected: '{value}' is not a positive integer"),
        }
    }
}

fn set_buffer_sizes(socket: &UdpSocket, buffer_kb: u32) {
    let bytes = buffer_kb as usize * 1024;
    let sock_ref = socket2::SockRef::from(socket);
    if let Err(e) = sock_ref.set_send_buffer_size(bytes) {
        warn!("failed to set send buffer size: {e}");
    }
    if let Err(e) = sock_ref.set_recv_buffer_size(bytes) {
        warn!("failed to set recv buffer size: {e}");
    }
}
