/*
   Copyright The containerd Authors.

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

use std::io::{self, Write};
use std::sync::Mutex;

use log::{LevelFilter, Metadata, Record};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::Result;

/// Logger writing one line per record to a stream, stderr unless asked otherwise.
pub struct StreamLogger {
    stream: Mutex<Box<dyn Write + Send>>,
    level: LevelFilter,
}

impl StreamLogger {
    pub fn new(level: LevelFilter, to_stdout: bool) -> StreamLogger {
        let stream: Box<dyn Write + Send> = if to_stdout {
            Box::new(io::stdout())
        } else {
            Box::new(io::stderr())
        };
        Self::with_writer(level, stream)
    }

    pub fn with_writer(level: LevelFilter, stream: Box<dyn Write + Send>) -> StreamLogger {
        StreamLogger {
            stream: Mutex::new(stream),
            level,
        }
    }
}

impl log::Log for StreamLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        if let Ok(mut stream) = self.stream.lock() {
            // Nowhere left to report a failing log stream to.
            let _ = writeln!(
                stream,
                "time=\"{}\" level={} msg=\"{}\"",
                now,
                record.level().as_str().to_lowercase(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut stream) = self.stream.lock() {
            let _ = stream.flush();
        }
    }
}

/// Installs the process wide logger. Must run once, before anything logs.
pub fn init(level: LevelFilter, to_stdout: bool) -> Result<()> {
    let logger = StreamLogger::new(level, to_stdout);

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);

    Ok(())
}
