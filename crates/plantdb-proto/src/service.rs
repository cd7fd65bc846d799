//! Transport-independent handling of plant, stats, pack list and transfer
//! frames against a [`PackStore`].
//!
//! Writes either answer immediately through the returned value and the
//! subscriber, or configure what the next read returns, mirroring a
//! write-then-read characteristic pair.

use crate::error::ProtoError;
use crate::frames::{
    encode_missing_pack_content, encode_pack_content, encode_pack_list, encode_plant_list,
    encode_stats, plant_filter, stream_flags, ListRequest, OpResult, Operation, PackListOp,
    PackListRequest, DELETE_REQUEST_LEN, FILTER_ALL, LIST_PAGE_MAX, LIST_REQUEST_LEN,
    PACK_LIST_PAGE_MAX, PACK_LIST_REQUEST_LEN, STATS_FRAME_LEN,
};
use crate::notify::{Channel, Notifier, NotifyError};
use crate::transfer::{
    opcode, PackTransfer, StartRequest, TransferState, TransferStatus, DATA_HEADER_LEN,
    STATUS_LEN,
};
use plantdb_core::error::Error;
use plantdb_core::result::ResultCode;
use plantdb_core::types::{PackRecord, StorageStats, StorageStatus};
use plantdb_format::bytes::{read_u16, read_u32};
use plantdb_format::{decode_plant_payload, PLANT_PAYLOAD_LEN};
use plantdb_store::{ListQuery, PackStore, PlantFilter, PlantPage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Delays between retries of a plant stream frame refused as busy.
pub const DEFAULT_BACKOFF: [Duration; 6] = [
    Duration::from_millis(10),
    Duration::from_millis(20),
    Duration::from_millis(40),
    Duration::from_millis(80),
    Duration::from_millis(160),
    Duration::from_millis(320),
];

const PAYLOAD_PLANT_ID: usize = 0;
const PAYLOAD_VERSION: usize = 4;

/// What a plant write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantWrite {
    /// A paged listing was configured for the next read.
    ListConfigured,
    /// Every matching plant was pushed to the subscriber.
    Streamed { frames: usize },
    /// An install or delete ran; the result was also sent to the subscriber.
    Op(OpResult),
}

#[derive(Debug)]
struct Session {
    list: ListRequest,
    pack_list: PackListRequest,
    subscriber: Option<Arc<dyn Notifier>>,
    transfer: PackTransfer,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            list: ListRequest {
                offset: 0,
                max_count: u8::try_from(LIST_PAGE_MAX).unwrap_or(u8::MAX),
                filter: FILTER_ALL,
            },
            pack_list: PackListRequest {
                opcode: PackListOp::List.as_u8(),
                param: 0,
            },
            subscriber: None,
            transfer: PackTransfer::new(),
        }
    }
}

#[derive(Debug)]
pub struct PlantService {
    store: Option<Arc<PackStore>>,
    backoff: Vec<Duration>,
    session: Mutex<Session>,
}

impl PlantService {
    /// `None` stands for a store that failed to open; every request still
    /// gets a well-formed answer.
    pub fn new(store: Option<Arc<PackStore>>) -> Self {
        Self {
            store,
            backoff: DEFAULT_BACKOFF.to_vec(),
            session: Mutex::new(Session::default()),
        }
    }

    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn subscribe(&self, notifier: Arc<dyn Notifier>) {
        self.session().subscriber = Some(notifier);
    }

    pub fn unsubscribe(&self) {
        self.session().subscriber = None;
    }

    /// Dispatches on length: list request, delete request or plant payload.
    pub fn write_plant(&self, bytes: &[u8]) -> Result<PlantWrite, ProtoError> {
        match bytes.len() {
            LIST_REQUEST_LEN => self.list_request(ListRequest::decode(bytes)?),
            DELETE_REQUEST_LEN => Ok(PlantWrite::Op(self.delete(read_u16(bytes, 0)?))),
            PLANT_PAYLOAD_LEN => Ok(PlantWrite::Op(self.install(bytes))),
            len => {
                warn!(len, "plant write with unexpected length");
                Err(ProtoError::InvalidLength {
                    frame: "plant",
                    len,
                })
            }
        }
    }

    /// The page selected by the last list request.
    pub fn read_plant(&self) -> Vec<u8> {
        let request = self.session().list;
        let Some(store) = self.ready_store() else {
            warn!("plant read while store not ready");
            return encode_plant_list(0, stream_flags::NORMAL, &[]);
        };
        let query = ListQuery::new(usize::from(request.offset), request.page_size())
            .with_filter(plant_filter(request.filter));
        match store.page_plants(&query) {
            Ok(page) => {
                encode_plant_list(saturate_u16(page.total), stream_flags::NORMAL, &page.entries)
            }
            Err(e) => {
                error!(error = %e, "failed to list plants");
                encode_plant_list(0, stream_flags::NORMAL, &[])
            }
        }
    }

    pub fn read_stats(&self) -> [u8; STATS_FRAME_LEN] {
        let stats = self.store.as_ref().map_or_else(
            || StorageStats {
                status: StorageStatus::NotReady,
                ..StorageStats::default()
            },
            |store| store.stats(),
        );
        debug!(?stats, "stats read");
        encode_stats(&stats)
    }

    pub fn write_pack_list(&self, bytes: &[u8]) -> Result<(), ProtoError> {
        if bytes.len() < PACK_LIST_REQUEST_LEN {
            warn!(len = bytes.len(), "pack list write too short");
            return Err(ProtoError::InvalidLength {
                frame: "pack list",
                len: bytes.len(),
            });
        }
        let request = PackListRequest::decode(bytes)?;
        match PackListOp::from_u8(request.opcode) {
            Some(PackListOp::List) => info!(offset = request.param, "pack list request"),
            Some(PackListOp::Content) => info!(pack_id = request.param, "pack content request"),
            None => warn!(opcode = request.opcode, "unknown pack list opcode; reads list packs"),
        }
        self.session().pack_list = request;
        Ok(())
    }

    /// A page of packs or one pack's members, per the last pack list write.
    pub fn read_pack_list(&self) -> Vec<u8> {
        let request = self.session().pack_list;
        match PackListOp::from_u8(request.opcode).unwrap_or_default() {
            PackListOp::List => self.pack_page(request.param),
            PackListOp::Content => self.pack_content(request.param),
        }
    }

    pub fn write_transfer(&self, bytes: &[u8]) -> Result<(), ProtoError> {
        self.write_transfer_at(bytes, Instant::now())
    }

    /// [`write_transfer`](Self::write_transfer) with an explicit clock for
    /// the inactivity timeout.
    pub fn write_transfer_at(&self, bytes: &[u8], now: Instant) -> Result<(), ProtoError> {
        let Some(&op) = bytes.first() else {
            return Err(ProtoError::InvalidLength {
                frame: "transfer",
                len: 0,
            });
        };
        let mut session = self.session();
        let outcome = match op {
            opcode::START => StartRequest::decode(bytes)
                .map_err(ProtoError::from)
                .and_then(|request| {
                    session.transfer.start(request, now).map_err(ProtoError::from)
                }),
            opcode::DATA => Self::transfer_data(&mut session.transfer, bytes, now),
            opcode::COMMIT => match self.store.as_deref() {
                Some(store) => session.transfer.commit(store).map(|_| ()).map_err(Into::into),
                None => Err(Error::NotReady.into()),
            },
            opcode::ABORT => {
                session.transfer.abort();
                Ok(())
            }
            other => Err(ProtoError::UnknownOpcode(other)),
        };
        let status = session.transfer.status();
        let subscriber = session.subscriber.clone();
        drop(session);

        if let Some(notifier) = subscriber {
            if let Err(e) = notifier.notify(Channel::Transfer, &status.encode()) {
                debug!(error = %e, "transfer status not delivered");
            }
        }
        outcome
    }

    pub fn read_transfer(&self) -> [u8; STATUS_LEN] {
        self.transfer_status().encode()
    }

    pub fn transfer_status(&self) -> TransferStatus {
        self.session().transfer.status()
    }

    pub fn transfer_state(&self) -> TransferState {
        self.session().transfer.state()
    }

    pub fn abort_transfer(&self) {
        self.session().transfer.abort();
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriber(&self) -> Option<Arc<dyn Notifier>> {
        self.session().subscriber.clone()
    }

    fn ready_store(&self) -> Option<&PackStore> {
        self.store.as_deref().filter(|store| store.is_mounted())
    }

    fn builtin_count(&self) -> u16 {
        self.store.as_ref().map_or(0, |store| store.builtin_count())
    }

    fn list_request(&self, request: ListRequest) -> Result<PlantWrite, ProtoError> {
        if request.looks_swapped() {
            warn!(
                raw = ?request.encode(),
                "plant list request looks byte-swapped; custom streaming is [00 00 00 FF]"
            );
        }
        if !request.is_stream() {
            debug!(
                offset = request.offset,
                max = request.max_count,
                filter = request.filter,
                "plant list configured"
            );
            self.session().list = request;
            return Ok(PlantWrite::ListConfigured);
        }
        let Some(notifier) = self.subscriber() else {
            warn!(filter = request.filter, "plant stream requested without a subscriber");
            return Err(ProtoError::NoSubscriber);
        };
        let frames = self.stream(notifier.as_ref(), plant_filter(request.filter))?;
        Ok(PlantWrite::Streamed { frames })
    }

    // Frames are sent in order; the first carries STARTING and the last
    // COMPLETE, so an empty listing is one frame with both. Each frame is
    // read from the store as it is sent.
    fn stream(&self, notifier: &dyn Notifier, filter: PlantFilter) -> Result<usize, ProtoError> {
        info!(?filter, "streaming plant list");
        let mut offset = 0;
        let mut sent = 0;
        loop {
            let page = self.stream_page(filter, offset);
            let total = saturate_u16(page.total);
            let mut flags = stream_flags::NORMAL;
            if sent == 0 {
                flags |= stream_flags::STARTING;
            }
            if page.next_offset.is_none() {
                flags |= stream_flags::COMPLETE;
            }
            match self.send_with_retry(notifier, &encode_plant_list(total, flags, &page.entries)) {
                Ok(()) => {}
                Err(NotifyError::Disconnected) => {
                    info!(sent, "subscriber left during plant stream");
                    return Ok(sent);
                }
                Err(NotifyError::Busy) => {
                    let retries = self.backoff.len();
                    error!(frame = sent, retries, "plant stream aborted");
                    let abort = encode_plant_list(total, stream_flags::ERROR, &[]);
                    if let Err(e) = notifier.notify(Channel::Plant, &abort) {
                        debug!(error = %e, "stream error frame not delivered");
                    }
                    return Err(ProtoError::StreamAborted { retries });
                }
                Err(NotifyError::Other(reason)) => {
                    warn!(frame = sent, %reason, "plant stream frame dropped");
                }
            }
            sent += 1;
            match page.next_offset {
                Some(next) => offset = next,
                None => break,
            }
        }
        debug!(frames = sent, "plant stream complete");
        Ok(sent)
    }

    fn send_with_retry(&self, notifier: &dyn Notifier, frame: &[u8]) -> Result<(), NotifyError> {
        let mut delays = self.backoff.iter();
        loop {
            match notifier.notify(Channel::Plant, frame) {
                Err(NotifyError::Busy) => {
                    let Some(delay) = delays.next() else {
                        return Err(NotifyError::Busy);
                    };
                    warn!(?delay, "notification buffers busy; retrying");
                    thread::sleep(*delay);
                }
                other => return other,
            }
        }
    }

    fn stream_page(&self, filter: PlantFilter, offset: usize) -> PlantPage {
        let Some(store) = self.ready_store() else {
            warn!("plant stream while store not ready");
            return PlantPage::default();
        };
        let query = ListQuery::new(offset, LIST_PAGE_MAX).with_filter(filter);
        store.page_plants(&query).unwrap_or_else(|e| {
            error!(offset, error = %e, "failed to list plants");
            PlantPage::default()
        })
    }

    fn delete(&self, plant_id: u16) -> OpResult {
        let result = match self.store.as_deref() {
            Some(store) => match store.delete_plant(plant_id) {
                Ok(()) => ResultCode::Success,
                Err(e) => {
                    warn!(plant_id, error = %e, "plant delete failed");
                    e.code()
                }
            },
            None => ResultCode::IoError,
        };
        self.publish(OpResult {
            operation: Operation::Delete,
            result,
            plant_id,
            version: 0,
        })
    }

    fn install(&self, payload: &[u8]) -> OpResult {
        let plant_id = read_u16(payload, PAYLOAD_PLANT_ID).unwrap_or_default();
        let version = read_u16(payload, PAYLOAD_VERSION).unwrap_or_default();
        let result = match decode_plant_payload(payload) {
            Err(e) => {
                warn!(plant_id, error = %e, "malformed plant payload");
                e.code()
            }
            Ok(plant) => match self.store.as_deref() {
                Some(store) => match store.install_plant(&plant) {
                    Ok(outcome) => outcome.code(),
                    Err(e) => {
                        error!(plant_id, version, error = %e, "plant install failed");
                        e.code()
                    }
                },
                None => ResultCode::IoError,
            },
        };
        self.publish(OpResult {
            operation: Operation::Install,
            result,
            plant_id,
            version,
        })
    }

    fn publish(&self, op: OpResult) -> OpResult {
        if let Some(notifier) = self.subscriber() {
            if let Err(e) = notifier.notify(Channel::Plant, &op.encode()) {
                warn!(error = %e, "operation result not delivered");
            }
        }
        op
    }

    fn transfer_data(
        transfer: &mut PackTransfer,
        bytes: &[u8],
        now: Instant,
    ) -> Result<(), ProtoError> {
        if bytes.len() < DATA_HEADER_LEN {
            return Err(ProtoError::InvalidLength {
                frame: "transfer data",
                len: bytes.len(),
            });
        }
        let offset = read_u32(bytes, 1)?;
        let declared = read_u16(bytes, 5)?;
        transfer.data(offset, declared, &bytes[DATA_HEADER_LEN..], now)?;
        Ok(())
    }

    fn pack_page(&self, offset: u16) -> Vec<u8> {
        let builtin = PackRecord::builtin(self.builtin_count()).summary();
        let Some(store) = self.ready_store() else {
            return encode_pack_list(1, true, &[builtin]);
        };
        let page = store.list_packs(usize::from(offset), PACK_LIST_PAGE_MAX);
        match page.and_then(|page| Ok((page, store.pack_count()?))) {
            Ok((page, stored)) => {
                encode_pack_list(saturate_u16(stored + 1), offset == 0, &page)
            }
            Err(e) => {
                error!(error = %e, "failed to list packs");
                encode_pack_list(1, true, &[builtin])
            }
        }
    }

    fn pack_content(&self, pack_id: u16) -> Vec<u8> {
        let Some(store) = self.ready_store() else {
            return encode_missing_pack_content(pack_id);
        };
        match store.get_pack(pack_id) {
            Ok(pack) => encode_pack_content(&pack),
            Err(e) => {
                warn!(pack_id, error = %e, "pack content unavailable");
                encode_missing_pack_content(pack_id)
            }
        }
    }
}

fn saturate_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::transfer::encode_data_chunk;
    use plantdb_core::types::{CropCoefficients, PlantRecord, PACK_ID_BUILTIN};
    use plantdb_format::{crc32, encode_plant_payload, Collection, StoreLayout};
    use plantdb_store::{Medium, MemoryMedium};

    const BUILTIN: u16 = 12;

    fn plant(plant_id: u16, pack_id: u16) -> PlantRecord {
        PlantRecord {
            plant_id,
            pack_id,
            version: 1,
            common_name: format!("Plant {plant_id}"),
            kc: CropCoefficients {
                ini: 0.4,
                dev: 0.7,
                mid: 1.0,
                end: 0.5,
            },
            root_depth_min_m: 0.2,
            root_depth_max_m: 0.8,
            ..PlantRecord::default()
        }
    }

    fn store_with(custom: &[(u16, u16)]) -> Arc<PackStore> {
        let medium: Arc<dyn Medium> = Arc::new(MemoryMedium::new());
        let store = PackStore::open(StoreLayout::new("/vol"), medium, BUILTIN).unwrap();
        for id in 1..=BUILTIN {
            store.install_plant(&plant(id, PACK_ID_BUILTIN)).unwrap();
        }
        for (id, pack) in custom {
            store.install_plant(&plant(*id, *pack)).unwrap();
        }
        Arc::new(store)
    }

    fn service(store: Arc<PackStore>) -> (PlantService, Arc<RecordingNotifier>) {
        let service = PlantService::new(Some(store)).with_backoff(vec![Duration::ZERO; 6]);
        let notifier = Arc::new(RecordingNotifier::default());
        service.subscribe(notifier.clone());
        (service, notifier)
    }

    fn header(frame: &[u8]) -> (u16, u8, u8) {
        (read_u16(frame, 0).unwrap(), frame[2], frame[3])
    }

    #[test]
    fn install_and_delete_notify_results() {
        let store = store_with(&[]);
        let (service, notifier) = service(store.clone());
        let payload = encode_plant_payload(&plant(200, 3)).unwrap();

        let written = service.write_plant(&payload).unwrap();
        let PlantWrite::Op(op) = written else {
            panic!("expected an op result, got {written:?}");
        };
        assert_eq!(op.result, ResultCode::Success);
        assert_eq!(store.get_plant(200).unwrap().pack_id, 3);

        let again = service.write_plant(&payload).unwrap();
        assert_eq!(
            again,
            PlantWrite::Op(OpResult {
                operation: Operation::Install,
                result: ResultCode::AlreadyCurrent,
                plant_id: 200,
                version: 1,
            })
        );

        service.write_plant(&200u16.to_le_bytes()).unwrap();
        service.write_plant(&200u16.to_le_bytes()).unwrap();
        let results = notifier.frames(Channel::Plant);
        assert_eq!(results.len(), 4);
        assert_eq!(results[2], [1, 0, 200, 0, 0, 0, 0, 0]);
        assert_eq!(results[3][1], ResultCode::NotFound.as_u8());
    }

    #[test]
    fn invalid_plant_is_reported_not_stored() {
        let store = store_with(&[]);
        let (service, notifier) = service(store.clone());
        let mut bad = plant(200, 3);
        bad.kc.mid = 9.0;
        let PlantWrite::Op(op) = service.write_plant(&encode_plant_payload(&bad).unwrap()).unwrap()
        else {
            panic!("expected an op result");
        };
        assert_eq!(op.result, ResultCode::InvalidData);
        assert!(store.get_plant(200).is_err());
        assert_eq!(notifier.frames(Channel::Plant).len(), 1);
    }

    #[test]
    fn odd_lengths_are_rejected() {
        let (service, _) = service(store_with(&[]));
        assert!(matches!(
            service.write_plant(&[0; 5]),
            Err(ProtoError::InvalidLength { len: 5, .. })
        ));
    }

    #[test]
    fn paged_reads_follow_the_last_request() {
        let (service, _) = service(store_with(&[(100, 2), (101, 3), (102, 2)]));

        let all = service.read_plant();
        assert_eq!(header(&all), (15, 10, 0));

        let custom = ListRequest {
            offset: 0,
            max_count: 5,
            filter: 0xFF,
        };
        service.write_plant(&custom.encode()).unwrap();
        let frame = service.read_plant();
        assert_eq!(header(&frame), (15, 3, 0));
        assert_eq!(read_u16(&frame, 4).unwrap(), 100);

        let pack_two = ListRequest {
            offset: 0,
            max_count: 5,
            filter: 2,
        };
        service.write_plant(&pack_two.encode()).unwrap();
        let frame = service.read_plant();
        assert_eq!(header(&frame), (15, 2, 0));
        assert_eq!(read_u16(&frame, 4 + 22).unwrap(), 102);
    }

    #[test]
    fn stream_chunks_every_match() {
        let (service, notifier) = service(store_with(&[(100, 2), (101, 2)]));
        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: FILTER_ALL,
        };
        assert_eq!(
            service.write_plant(&request.encode()).unwrap(),
            PlantWrite::Streamed { frames: 2 }
        );
        let frames = notifier.frames(Channel::Plant);
        assert_eq!(header(&frames[0]), (14, 10, stream_flags::STARTING));
        assert_eq!(header(&frames[1]), (14, 4, stream_flags::COMPLETE));
    }

    #[test]
    fn empty_stream_is_one_complete_frame() {
        let (service, notifier) = service(store_with(&[]));
        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: 0xFF,
        };
        service.write_plant(&request.encode()).unwrap();
        let frames = notifier.frames(Channel::Plant);
        assert_eq!(frames.len(), 1);
        assert_eq!(header(&frames[0]), (BUILTIN, 0, 0x81));
    }

    #[test]
    fn empty_store_streams_zero_total() {
        let medium: Arc<dyn Medium> = Arc::new(MemoryMedium::new());
        let empty = PackStore::open(StoreLayout::new("/vol"), medium, BUILTIN).unwrap();
        let (service, notifier) = service(Arc::new(empty));
        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: FILTER_ALL,
        };
        service.write_plant(&request.encode()).unwrap();
        assert_eq!(notifier.frames(Channel::Plant), [vec![0, 0, 0, 0x81]]);
    }

    #[test]
    fn corrupt_record_keeps_name_total_and_stream_order() {
        let medium = Arc::new(MemoryMedium::new());
        let shared: Arc<dyn Medium> = medium.clone();
        let store = PackStore::open(StoreLayout::new("/vol"), shared, BUILTIN).unwrap();
        for id in 1..=BUILTIN {
            store.install_plant(&plant(id, PACK_ID_BUILTIN)).unwrap();
        }
        let path = store.layout().record_path(Collection::Plants, 3);
        let mut bytes = medium.read(&path).unwrap();
        *bytes.last_mut().unwrap() ^= 0xFF;
        medium.write_synced(&path, &bytes).unwrap();
        let store = Arc::new(store);
        let (service, notifier) = service(store.clone());

        let frame = service.read_plant();
        assert_eq!(store.plant_count().unwrap(), usize::from(BUILTIN));
        assert_eq!(header(&frame), (BUILTIN, 10, 0));
        assert_eq!(read_u16(&frame, 4 + 2 * 22).unwrap(), 4);

        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: FILTER_ALL,
        };
        assert_eq!(
            service.write_plant(&request.encode()).unwrap(),
            PlantWrite::Streamed { frames: 2 }
        );
        let frames = notifier.frames(Channel::Plant);
        assert_eq!(header(&frames[0]), (BUILTIN, 10, stream_flags::STARTING));
        assert_eq!(header(&frames[1]), (BUILTIN, 1, stream_flags::COMPLETE));
        assert_eq!(read_u16(&frames[1], 4).unwrap(), BUILTIN);
    }

    #[test]
    fn busy_subscriber_is_retried_then_aborted() {
        let (service, notifier) = service(store_with(&[]));
        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: FILTER_ALL,
        };

        notifier.fail_with([NotifyError::Busy, NotifyError::Busy]);
        assert_eq!(
            service.write_plant(&request.encode()).unwrap(),
            PlantWrite::Streamed { frames: 2 }
        );

        notifier.fail_with(vec![NotifyError::Busy; 7]);
        assert!(matches!(
            service.write_plant(&request.encode()),
            Err(ProtoError::StreamAborted { retries: 6 })
        ));
        let frames = notifier.frames(Channel::Plant);
        let last = frames.last().unwrap();
        assert_eq!(last.len(), 4);
        assert_eq!(last[3], stream_flags::ERROR);
    }

    #[test]
    fn stream_needs_a_subscriber() {
        let service = PlantService::new(Some(store_with(&[])));
        let request = ListRequest {
            offset: 0,
            max_count: 0,
            filter: FILTER_ALL,
        };
        assert!(matches!(
            service.write_plant(&request.encode()),
            Err(ProtoError::NoSubscriber)
        ));
    }

    #[test]
    fn missing_store_still_answers() {
        let service = PlantService::new(None);
        assert_eq!(service.read_plant(), [0, 0, 0, 0]);
        assert_eq!(service.read_stats()[20], StorageStatus::NotReady.as_u8());
        let PlantWrite::Op(op) = service.write_plant(&7u16.to_le_bytes()).unwrap() else {
            panic!("expected an op result");
        };
        assert_eq!(op.result, ResultCode::IoError);

        let packs = service.read_pack_list();
        assert_eq!(header(&packs), (1, 1, 1));
    }

    #[test]
    fn stats_count_builtin_pack() {
        let store = store_with(&[(100, 2)]);
        let (service, _) = service(store.clone());
        let frame = service.read_stats();
        assert_eq!(read_u16(&frame, 12).unwrap(), 13);
        assert_eq!(read_u16(&frame, 14).unwrap(), 1);
        assert_eq!(read_u16(&frame, 16).unwrap(), 1);
        assert_eq!(read_u16(&frame, 18).unwrap(), BUILTIN);
        assert_eq!(read_u32(&frame, 22).unwrap(), store.change_counter());
    }

    #[test]
    fn pack_list_and_content() {
        let store = store_with(&[]);
        let pack = PackRecord {
            pack_id: 5,
            version: 2,
            name: "Herbs".to_string(),
            plant_ids: vec![100, 101],
        };
        store
            .install_pack(&pack, &[plant(100, 5), plant(101, 5)])
            .unwrap();
        let (service, _) = service(store);

        let list = service.read_pack_list();
        assert_eq!(header(&list), (2, 2, 1));
        assert_eq!(read_u16(&list, 4).unwrap(), 0);
        assert_eq!(read_u16(&list, 4 + 30).unwrap(), 5);

        let request = PackListRequest {
            opcode: PackListOp::Content.as_u8(),
            param: 5,
        };
        service.write_pack_list(&request.encode()).unwrap();
        let content = service.read_pack_list();
        assert_eq!(read_u16(&content, 4).unwrap(), 2);
        assert_eq!(read_u16(&content, 8).unwrap(), 100);
        assert_eq!(read_u16(&content, 10).unwrap(), 101);

        let missing = PackListRequest {
            opcode: PackListOp::Content.as_u8(),
            param: 77,
        };
        service.write_pack_list(&missing.encode()).unwrap();
        assert_eq!(service.read_pack_list(), [77, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn transfer_end_to_end() {
        let store = store_with(&[]);
        let (service, notifier) = service(store.clone());
        let bytes: Vec<u8> = [300u16, 301]
            .iter()
            .flat_map(|id| encode_plant_payload(&plant(*id, 9)).unwrap())
            .collect();
        let start = StartRequest {
            pack_id: 9,
            version: 1,
            plant_count: 2,
            total_size: bytes.len() as u32,
            crc32: crc32(&bytes),
            name: "Orchard".to_string(),
        };
        let now = Instant::now();
        service.write_transfer_at(&start.encode(), now).unwrap();
        service
            .write_transfer_at(&encode_data_chunk(0, &bytes[..200]), now)
            .unwrap();
        assert_eq!(service.read_transfer()[1], 64);
        service
            .write_transfer_at(&encode_data_chunk(200, &bytes[200..]), now)
            .unwrap();
        service.write_transfer_at(&[opcode::COMMIT], now).unwrap();

        assert_eq!(service.transfer_state(), TransferState::Complete);
        assert_eq!(store.get_pack(9).unwrap().plant_ids, [300, 301]);
        assert_eq!(notifier.frames(Channel::Transfer).len(), 4);
        assert!(matches!(
            service.write_transfer(&[0x09]),
            Err(ProtoError::UnknownOpcode(0x09))
        ));
    }
}
