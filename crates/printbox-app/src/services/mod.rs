// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — config resolution, the console submitter and the
// terminal-event archive around the print service.

pub mod archive;
pub mod console;
pub mod data_dir;
