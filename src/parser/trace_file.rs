//! Binary trace file reader and writer.
//!
//! The file is little-endian with packed fixed-size records:
//!
//! ```text
//! version:i32 total_length:i32
//! (count:i32 byte_offset:i64) x 5   samples, frames, functions, modules, threads
//! sampling_interval_ms:f64 session_start_ticks:i64 session_end_ticks:i64
//! ... record tables at their declared offsets ...
//! ```
//!
//! Strings are stored inline in fixed-capacity NUL-padded buffers.

use super::schema::{
    FunctionData, ModuleData, Sample, StackFrame, ThreadData, TraceHeader, NO_INDEX,
};
use crate::utils::config::{
    FILE_HEADER_SIZE, FUNCTION_NAME_CAPACITY, FUNCTION_RECORD_SIZE, MODULE_PATH_CAPACITY,
    MODULE_RECORD_SIZE, PDB_GUID_SIZE, SAMPLE_RECORD_SIZE, STACK_FRAME_RECORD_SIZE,
    THREAD_NAME_CAPACITY, THREAD_RECORD_SIZE, TRACE_FORMAT_VERSION, TRACE_HEADER_OFFSET,
    TRACE_HEADER_SIZE, UNKNOWN_FUNCTION_NAME,
};
use crate::utils::error::TraceError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

/// Location of one record table inside the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableEntry {
    count: i32,
    byte_offset: i64,
}

/// Immutable, fully decoded trace
///
/// Loaded once per file and never mutated afterwards. Every analysis
/// produces freshly owned output instead of touching these tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStore {
    header: TraceHeader,
    samples: Vec<Sample>,
    stack_frames: Vec<StackFrame>,
    functions: Vec<FunctionData>,
    modules: Vec<ModuleData>,
    threads: Vec<ThreadData>,
}

impl TraceStore {
    /// Assemble a store from decoded tables, validating every cross-table reference
    pub fn from_parts(
        header: TraceHeader,
        samples: Vec<Sample>,
        stack_frames: Vec<StackFrame>,
        functions: Vec<FunctionData>,
        modules: Vec<ModuleData>,
        threads: Vec<ThreadData>,
    ) -> Result<Self, TraceError> {
        let store = Self {
            header,
            samples,
            stack_frames,
            functions,
            modules,
            threads,
        };
        store.validate_references()?;
        Ok(store)
    }

    /// Load a trace file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        load_trace(path)
    }

    /// Release the store and everything it owns
    pub fn dispose(self) {
        debug!(
            "Releasing trace store ({} samples, {} frames)",
            self.samples.len(),
            self.stack_frames.len()
        );
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn stack_frames(&self) -> &[StackFrame] {
        &self.stack_frames
    }

    pub fn functions(&self) -> &[FunctionData] {
        &self.functions
    }

    pub fn modules(&self) -> &[ModuleData] {
        &self.modules
    }

    pub fn threads(&self) -> &[ThreadData] {
        &self.threads
    }

    /// Name of a function, or a placeholder for unknown ids
    pub fn function_name(&self, function_id: i32) -> &str {
        usize::try_from(function_id)
            .ok()
            .and_then(|id| self.functions.get(id))
            .map(|f| f.name.as_str())
            .unwrap_or(UNKNOWN_FUNCTION_NAME)
    }

    pub fn thread_name(&self, thread_index: i32) -> Option<&str> {
        usize::try_from(thread_index)
            .ok()
            .and_then(|i| self.threads.get(i))
            .map(|t| t.name.as_str())
    }

    /// Number of samples recorded on each thread, indexed like `threads()`
    pub fn thread_sample_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.threads.len()];
        for sample in &self.samples {
            if let Some(count) = usize::try_from(sample.thread_index)
                .ok()
                .and_then(|i| counts.get_mut(i))
            {
                *count += 1;
            }
        }
        counts
    }

    /// Check that every index stored in a record points inside its target table
    fn validate_references(&self) -> Result<(), TraceError> {
        let frame_count = self.stack_frames.len();
        let function_count = self.functions.len();

        for frame in &self.stack_frames {
            check_optional_index("caller frame", frame.caller_frame_id, frame_count)?;
            check_optional_index("function", frame.function_id, function_count)?;
            if frame.depth < 1 {
                return Err(TraceError::DataCorruption(format!(
                    "stack frame at {:#x} has depth {}",
                    frame.address, frame.depth
                )));
            }
        }

        for sample in &self.samples {
            check_optional_index("stack frame", sample.stack_trace_id, frame_count)?;
            check_optional_index("function", sample.function_id, function_count)?;
            if sample.thread_index < 0 || sample.thread_index as usize >= self.threads.len() {
                return Err(TraceError::invalid_index(
                    "thread",
                    sample.thread_index,
                    self.threads.len(),
                ));
            }
        }

        for function in &self.functions {
            check_optional_index("module", function.module_id, self.modules.len())?;
        }

        Ok(())
    }
}

/// Accept `-1` or an index inside `0..len`
fn check_optional_index(table: &'static str, index: i32, len: usize) -> Result<(), TraceError> {
    if index == NO_INDEX || (index >= 0 && (index as usize) < len) {
        Ok(())
    } else {
        Err(TraceError::invalid_index(table, index, len))
    }
}

/// Read and decode a trace file
///
/// **Public** - main entry point for loading
///
/// # Errors
/// * `TraceError::Io` - the file cannot be read
/// * `TraceError::Malformed` / `TraceError::UnsupportedVersion` - bad header
/// * `TraceError::InvalidIndex` / `TraceError::DataCorruption` - bad records
pub fn load_trace(path: impl AsRef<Path>) -> Result<TraceStore, TraceError> {
    let path = path.as_ref();
    info!("Loading trace: {}", path.display());

    let data = std::fs::read(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let store = parse_trace(&data)?;
    info!(
        "Loaded {} samples, {} frames, {} functions, {} modules, {} threads",
        store.samples.len(),
        store.stack_frames.len(),
        store.functions.len(),
        store.modules.len(),
        store.threads.len()
    );
    Ok(store)
}

/// Decode a trace from its raw bytes
///
/// The header is fully validated before any record is decoded, so a
/// malformed file never yields a partially loaded store.
pub fn parse_trace(data: &[u8]) -> Result<TraceStore, TraceError> {
    if data.len() < FILE_HEADER_SIZE + TRACE_HEADER_SIZE {
        return Err(TraceError::Malformed(format!(
            "file is {} bytes, header needs {}",
            data.len(),
            FILE_HEADER_SIZE + TRACE_HEADER_SIZE
        )));
    }

    let mut cursor = Cursor::new(data);
    let version = cursor.read_i32::<LittleEndian>().map_err(truncated)?;
    if version != TRACE_FORMAT_VERSION {
        return Err(TraceError::UnsupportedVersion {
            found: version,
            expected: TRACE_FORMAT_VERSION,
        });
    }

    let total_length = cursor.read_i32::<LittleEndian>().map_err(truncated)?;
    let total_length = usize::try_from(total_length)
        .map_err(|_| TraceError::Malformed(format!("negative total length {}", total_length)))?;
    if total_length > data.len() {
        return Err(TraceError::Malformed(format!(
            "header declares {} bytes but file has {}",
            total_length,
            data.len()
        )));
    }
    if total_length < FILE_HEADER_SIZE + TRACE_HEADER_SIZE {
        return Err(TraceError::Malformed(format!(
            "declared length {} is smaller than the headers",
            total_length
        )));
    }

    let mut tables = [TableEntry {
        count: 0,
        byte_offset: 0,
    }; 5];
    for table in tables.iter_mut() {
        table.count = cursor.read_i32::<LittleEndian>().map_err(truncated)?;
        table.byte_offset = cursor.read_i64::<LittleEndian>().map_err(truncated)?;
    }
    let [samples_at, frames_at, functions_at, modules_at, threads_at] = tables;

    let data = &data[..total_length];
    let sample_range = table_range("samples", samples_at, SAMPLE_RECORD_SIZE, total_length)?;
    let frame_range =
        table_range("stack frames", frames_at, STACK_FRAME_RECORD_SIZE, total_length)?;
    let function_range =
        table_range("functions", functions_at, FUNCTION_RECORD_SIZE, total_length)?;
    let module_range = table_range("modules", modules_at, MODULE_RECORD_SIZE, total_length)?;
    let thread_range = table_range("threads", threads_at, THREAD_RECORD_SIZE, total_length)?;

    let mut cursor =
        Cursor::new(&data[TRACE_HEADER_OFFSET..TRACE_HEADER_OFFSET + TRACE_HEADER_SIZE]);
    let header = TraceHeader {
        sampling_interval_ms: cursor.read_f64::<LittleEndian>().map_err(truncated)?,
        session_start_ticks: cursor.read_i64::<LittleEndian>().map_err(truncated)?,
        session_end_ticks: cursor.read_i64::<LittleEndian>().map_err(truncated)?,
    };
    debug!("Trace header: {:?}", header);

    let samples = read_records(&data[sample_range], read_sample)?;
    let stack_frames = read_records(&data[frame_range], read_stack_frame)?;
    let functions = read_records(&data[function_range], read_function)?;
    let modules = read_records(&data[module_range], read_module)?;
    let threads = read_records(&data[thread_range], read_thread)?;

    TraceStore::from_parts(header, samples, stack_frames, functions, modules, threads)
}

fn truncated(e: io::Error) -> TraceError {
    TraceError::Malformed(format!("truncated header: {}", e))
}

/// Resolve a table entry to a byte range inside the declared file length
fn table_range(
    name: &str,
    entry: TableEntry,
    record_size: usize,
    total_length: usize,
) -> Result<std::ops::Range<usize>, TraceError> {
    let count = usize::try_from(entry.count)
        .map_err(|_| TraceError::Malformed(format!("{} table has count {}", name, entry.count)))?;
    if count == 0 {
        return Ok(0..0);
    }

    let start = usize::try_from(entry.byte_offset).map_err(|_| {
        TraceError::Malformed(format!("{} table has offset {}", name, entry.byte_offset))
    })?;
    let end = count
        .checked_mul(record_size)
        .and_then(|len| start.checked_add(len))
        .filter(|&end| end <= total_length)
        .ok_or_else(|| {
            TraceError::Malformed(format!(
                "{} table ({} records at offset {}) extends beyond {} bytes",
                name, count, start, total_length
            ))
        })?;

    if start < TRACE_HEADER_OFFSET + TRACE_HEADER_SIZE {
        return Err(TraceError::Malformed(format!(
            "{} table at offset {} overlaps the file header",
            name, start
        )));
    }

    Ok(start..end)
}

/// Decode a packed table; the slice length is already a multiple of the record size
fn read_records<T>(
    bytes: &[u8],
    decode: impl Fn(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> Result<Vec<T>, TraceError> {
    let mut cursor = Cursor::new(bytes);
    let mut records = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        let record = decode(&mut cursor)
            .map_err(|e| TraceError::Malformed(format!("truncated record: {}", e)))?;
        records.push(record);
    }
    Ok(records)
}

fn read_sample(cur: &mut Cursor<&[u8]>) -> io::Result<Sample> {
    Ok(Sample {
        stack_trace_id: cur.read_i32::<LittleEndian>()?,
        function_id: cur.read_i32::<LittleEndian>()?,
        address: cur.read_i64::<LittleEndian>()?,
        timestamp: cur.read_f64::<LittleEndian>()?,
        thread_index: cur.read_i32::<LittleEndian>()?,
    })
}

fn read_stack_frame(cur: &mut Cursor<&[u8]>) -> io::Result<StackFrame> {
    Ok(StackFrame {
        address: cur.read_i64::<LittleEndian>()?,
        function_id: cur.read_i32::<LittleEndian>()?,
        caller_frame_id: cur.read_i32::<LittleEndian>()?,
        depth: cur.read_i32::<LittleEndian>()?,
    })
}

fn read_function(cur: &mut Cursor<&[u8]>) -> io::Result<FunctionData> {
    Ok(FunctionData {
        module_id: cur.read_i32::<LittleEndian>()?,
        name: read_fixed_str(cur, FUNCTION_NAME_CAPACITY)?,
        base_address: cur.read_i64::<LittleEndian>()?,
        length: cur.read_i32::<LittleEndian>()?,
    })
}

fn read_module(cur: &mut Cursor<&[u8]>) -> io::Result<ModuleData> {
    let file_path = read_fixed_str(cur, MODULE_PATH_CAPACITY)?;
    let pdb_name = read_fixed_str(cur, MODULE_PATH_CAPACITY)?;
    let image_base = cur.read_u64::<LittleEndian>()?;
    let image_end = cur.read_u64::<LittleEndian>()?;
    let is_managed = cur.read_u32::<LittleEndian>()? != 0;
    let checksum = cur.read_u32::<LittleEndian>()?;
    let pdb_age = cur.read_u32::<LittleEndian>()?;
    let mut pdb_guid = [0u8; PDB_GUID_SIZE];
    cur.read_exact(&mut pdb_guid)?;

    Ok(ModuleData {
        file_path,
        pdb_name,
        image_base,
        image_end,
        is_managed,
        checksum,
        pdb_age,
        pdb_guid,
    })
}

fn read_thread(cur: &mut Cursor<&[u8]>) -> io::Result<ThreadData> {
    Ok(ThreadData {
        name: read_fixed_str(cur, THREAD_NAME_CAPACITY)?,
    })
}

/// Read a NUL-padded inline string buffer
fn read_fixed_str(cur: &mut Cursor<&[u8]>, capacity: usize) -> io::Result<String> {
    let mut buf = vec![0u8; capacity];
    cur.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(capacity);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Serialize a store to the on-disk layout
///
/// Tables are laid out back to back after the trace header, in file-header order.
pub fn encode_trace(store: &TraceStore) -> Result<Vec<u8>, TraceError> {
    let sizes = [
        (store.samples.len(), SAMPLE_RECORD_SIZE),
        (store.stack_frames.len(), STACK_FRAME_RECORD_SIZE),
        (store.functions.len(), FUNCTION_RECORD_SIZE),
        (store.modules.len(), MODULE_RECORD_SIZE),
        (store.threads.len(), THREAD_RECORD_SIZE),
    ];

    let mut entries = Vec::with_capacity(sizes.len());
    let mut offset = FILE_HEADER_SIZE + TRACE_HEADER_SIZE;
    for (count, record_size) in sizes {
        let count = i32::try_from(count).map_err(|_| {
            TraceError::Malformed(format!("{} records do not fit the format", count))
        })?;
        entries.push(TableEntry {
            count,
            byte_offset: offset as i64,
        });
        offset += count as usize * record_size;
    }
    let total_length = i32::try_from(offset)
        .map_err(|_| TraceError::Malformed(format!("trace of {} bytes is too large", offset)))?;

    let mut out = Vec::with_capacity(offset);
    encode_into(store, total_length, &entries, &mut out)
        .map_err(|e| TraceError::Malformed(format!("encoding failed: {}", e)))?;
    debug_assert_eq!(out.len(), offset);
    Ok(out)
}

fn encode_into(
    store: &TraceStore,
    total_length: i32,
    entries: &[TableEntry],
    out: &mut Vec<u8>,
) -> io::Result<()> {
    out.write_i32::<LittleEndian>(TRACE_FORMAT_VERSION)?;
    out.write_i32::<LittleEndian>(total_length)?;
    for entry in entries {
        out.write_i32::<LittleEndian>(entry.count)?;
        out.write_i64::<LittleEndian>(entry.byte_offset)?;
    }

    out.write_f64::<LittleEndian>(store.header.sampling_interval_ms)?;
    out.write_i64::<LittleEndian>(store.header.session_start_ticks)?;
    out.write_i64::<LittleEndian>(store.header.session_end_ticks)?;

    for sample in &store.samples {
        out.write_i32::<LittleEndian>(sample.stack_trace_id)?;
        out.write_i32::<LittleEndian>(sample.function_id)?;
        out.write_i64::<LittleEndian>(sample.address)?;
        out.write_f64::<LittleEndian>(sample.timestamp)?;
        out.write_i32::<LittleEndian>(sample.thread_index)?;
    }

    for frame in &store.stack_frames {
        out.write_i64::<LittleEndian>(frame.address)?;
        out.write_i32::<LittleEndian>(frame.function_id)?;
        out.write_i32::<LittleEndian>(frame.caller_frame_id)?;
        out.write_i32::<LittleEndian>(frame.depth)?;
    }

    for function in &store.functions {
        out.write_i32::<LittleEndian>(function.module_id)?;
        write_fixed_str(out, &function.name, FUNCTION_NAME_CAPACITY)?;
        out.write_i64::<LittleEndian>(function.base_address)?;
        out.write_i32::<LittleEndian>(function.length)?;
    }

    for module in &store.modules {
        write_fixed_str(out, &module.file_path, MODULE_PATH_CAPACITY)?;
        write_fixed_str(out, &module.pdb_name, MODULE_PATH_CAPACITY)?;
        out.write_u64::<LittleEndian>(module.image_base)?;
        out.write_u64::<LittleEndian>(module.image_end)?;
        out.write_u32::<LittleEndian>(u32::from(module.is_managed))?;
        out.write_u32::<LittleEndian>(module.checksum)?;
        out.write_u32::<LittleEndian>(module.pdb_age)?;
        out.write_all(&module.pdb_guid)?;
    }

    for thread in &store.threads {
        write_fixed_str(out, &thread.name, THREAD_NAME_CAPACITY)?;
    }

    Ok(())
}

/// Write a string into a fixed NUL-padded buffer, truncating on a char boundary
fn write_fixed_str(out: &mut Vec<u8>, value: &str, capacity: usize) -> io::Result<()> {
    let mut end = value.len().min(capacity - 1);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    out.write_all(&value.as_bytes()[..end])?;
    out.write_all(&vec![0u8; capacity - end])
}

/// Encode a store and write it to `path`
pub fn write_trace(store: &TraceStore, path: impl AsRef<Path>) -> Result<(), TraceError> {
    let path = path.as_ref();
    let bytes = encode_trace(store)?;
    let io_err = |source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    info!("Trace written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
