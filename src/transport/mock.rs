//! Scripted board used by the driver tests.
//!
//! Every transmitted chunk is matched against the reply rules in order. The
//! first matching rule schedules its reply a number of ticks later; chunks that
//! match no rule get the default reply (`\r\nOK\r\n` after one tick) unless the
//! board is silent. Ticks only advance in [`Board::relax`], so timeouts elapse
//! without real time passing.

use std::io;
use std::sync::Once;

use bytes::Bytes;

use crate::client::Interrupts;
use crate::protocol::frame::contains;
use crate::transport::{Board, Pin};

static TRACING: Once = Once::new();

/// Installs a test-writer tracing subscriber once per test binary.
pub(crate) fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
struct Rule {
    trigger: Vec<u8>,
    reply: Option<Bytes>,
    delay_ticks: u64,
    once: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MockBoard {
    interrupts: Option<Interrupts>,
    rules: Vec<Rule>,
    default_reply: Option<Bytes>,
    pending: Vec<(u64, Bytes)>,
    now: u64,
    pub(crate) sent: Vec<Bytes>,
    pub(crate) pins: Vec<(Pin, bool)>,
    pub(crate) delays: Vec<u32>,
    pub(crate) resets: usize,
    pub(crate) fail_transmit: bool,
}

impl MockBoard {
    pub(crate) fn new() -> Self {
        init_tracing();
        Self {
            default_reply: Some(Bytes::from_static(b"\r\nOK\r\n")),
            ..Self::default()
        }
    }

    /// Chunks that match no rule get no reply.
    pub(crate) fn silent(mut self) -> Self {
        self.default_reply = None;
        self
    }

    /// Replies to every chunk containing `trigger` after `delay_ticks`.
    pub(crate) fn reply(mut self, trigger: &str, reply: &str, delay_ticks: u64) -> Self {
        self.rules.push(Rule {
            trigger: trigger.as_bytes().to_vec(),
            reply: Some(Bytes::copy_from_slice(reply.as_bytes())),
            delay_ticks,
            once: false,
        });
        self
    }

    /// Replies to the next chunk containing `trigger` only.
    pub(crate) fn reply_once(mut self, trigger: &str, reply: &str, delay_ticks: u64) -> Self {
        self.rules.push(Rule {
            trigger: trigger.as_bytes().to_vec(),
            reply: Some(Bytes::copy_from_slice(reply.as_bytes())),
            delay_ticks,
            once: true,
        });
        self
    }

    /// Never answers chunks containing `trigger`.
    pub(crate) fn ignore(mut self, trigger: &str) -> Self {
        self.rules.push(Rule {
            trigger: trigger.as_bytes().to_vec(),
            reply: None,
            delay_ticks: 0,
            once: false,
        });
        self
    }

    /// Transmitted chunks as lossy text.
    pub(crate) fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }

    /// Returns true if some transmitted chunk contains `needle`.
    pub(crate) fn sent_contains(&self, needle: &str) -> bool {
        self.sent
            .iter()
            .any(|chunk| contains(chunk, needle.as_bytes()))
    }

    fn deliver_due(&mut self) {
        let Some(irq) = self.interrupts.clone() else {
            return;
        };
        let now = self.now;
        let (due, later): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, data) in due {
            irq.on_receive(&data);
        }
    }
}

impl Board for MockBoard {
    fn transmit(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_transmit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link down"));
        }
        self.sent.push(Bytes::copy_from_slice(data));

        let matched = self
            .rules
            .iter()
            .position(|rule| contains(data, &rule.trigger));

        let scheduled = match matched {
            Some(index) => {
                let rule = self.rules[index].clone();
                if rule.once {
                    self.rules.remove(index);
                }
                rule.reply.map(|reply| (rule.delay_ticks, reply))
            }
            None => self.default_reply.clone().map(|reply| (1, reply)),
        };

        if let Some((delay, reply)) = scheduled {
            self.pending.push((self.now + delay, reply));
        }
        Ok(())
    }

    fn write_pin(&mut self, pin: Pin, high: bool) -> io::Result<()> {
        self.pins.push((pin, high));
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn reset_device(&mut self) -> io::Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn attach(&mut self, interrupts: &Interrupts) {
        self.interrupts = Some(interrupts.clone());
    }

    fn relax(&mut self) {
        self.now += 1;
        self.deliver_due();
        if let Some(irq) = &self.interrupts {
            irq.on_tick();
        }
    }
}
