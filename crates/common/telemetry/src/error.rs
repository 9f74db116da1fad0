// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to route `log` records into tracing"))]
    InitLogTracer {
        source: tracing_log::log::SetLoggerError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to create rolling log files in {dir}"))]
    CreateAppender {
        dir:    String,
        source: tracing_appender::rolling::InitError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Invalid log level filter `{level}`"))]
    ParseLevel {
        level:  String,
        source: tracing_subscriber::filter::ParseError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to install the global tracing subscriber"))]
    SetGlobalDefault {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        loc:    Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
