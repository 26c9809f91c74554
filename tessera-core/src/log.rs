// Copyright (c) 2019-present the Tessera Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! A minimal process-wide logger. Asset loading happens off the main thread, so every
//! diagnostic message funnels through here rather than through ad-hoc `eprintln!`.

use instant::Instant;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::mpsc::Sender;

/// Severity of a single log record.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MessageKind {
    Information = 0,
    Warning = 1,
    Error = 2,
}

impl MessageKind {
    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// A single formatted record, broadcast to any registered listener.
#[derive(Clone, Debug)]
pub struct LogMessage {
    pub kind: MessageKind,
    pub elapsed_ms: u128,
    pub content: String,
}

struct LogState {
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    time_origin: Instant,
}

lazy_static! {
    static ref LOG: Mutex<LogState> = Mutex::new(LogState {
        verbosity: MessageKind::Information,
        listeners: Default::default(),
        time_origin: Instant::now(),
    });
}

/// Process-wide logger. All methods are static; there is exactly one logger per process,
/// mirroring the way the rest of the engine expects diagnostics to be a free function rather
/// than an object threaded through every call site.
pub struct Log;

impl Log {
    /// Sets the minimal severity that will actually be printed/broadcast.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Registers a listener that receives every message at or above the current verbosity.
    pub fn add_listener(sender: Sender<LogMessage>) {
        LOG.lock().listeners.push(sender);
    }

    fn write_internal(kind: MessageKind, mut content: String) {
        let mut state = LOG.lock();
        if (kind as u8) < (state.verbosity as u8) {
            return;
        }

        content.insert_str(0, kind.as_str());
        if !content.ends_with('\n') {
            content.push('\n');
        }

        print!("{content}");

        let message = LogMessage {
            kind,
            elapsed_ms: state.time_origin.elapsed().as_millis(),
            content,
        };

        state.listeners.retain(|sender| sender.send(message.clone()).is_ok());
    }

    pub fn write(kind: MessageKind, msg: String) {
        Self::write_internal(kind, msg);
    }

    pub fn writeln(kind: MessageKind, msg: String) {
        Self::write_internal(kind, msg);
    }

    pub fn info<S: Into<String>>(msg: S) {
        Self::write_internal(MessageKind::Information, msg.into());
    }

    pub fn warn<S: Into<String>>(msg: S) {
        Self::write_internal(MessageKind::Warning, msg.into());
    }

    pub fn err<S: Into<String>>(msg: S) {
        Self::write_internal(MessageKind::Error, msg.into());
    }

    /// Logs the `Err` side of a result, if any. Returns the original result unchanged so it
    /// can be chained at the call site.
    pub fn verify<T, E: std::fmt::Debug>(result: Result<T, E>) -> Result<T, E> {
        if let Err(ref e) = result {
            Self::err(format!("{e:?}"));
        }
        result
    }
}
