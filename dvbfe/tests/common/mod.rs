//! Recording fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dvbfe::frontend::{DiseqcMessage, MiniCommand, SecTone, SecVoltage};
use dvbfe::{
    FeStatus, FrontendDevice, FrontendInfo, FrontendKind, SectionDemux, SectionFilter,
    TableFilter, TableManager, Timings, TuningParams, TuningTarget,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SetFrontend(TuningParams),
    Tone(SecTone),
    Voltage(SecVoltage),
    Diseqc(Vec<u8>),
    Burst(MiniCommand),
    AddDefault(String),
    Arm(String),
    TearDown(String),
}

/// Ordered log of hardware and table events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.lock().iter().position(|e| e == event)
    }

    pub fn tunes(&self) -> Vec<TuningParams> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::SetFrontend(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn band_switch_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Event::Tone(_) | Event::Voltage(_) | Event::Diseqc(_) | Event::Burst(_)
                )
            })
            .cloned()
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

/// Frontend that records every control call.
pub struct FakeFrontend {
    pub log: Arc<EventLog>,
    status: Mutex<FeStatus>,
    uncorrected: Mutex<VecDeque<i32>>,
    fail_set_frontend: Mutex<bool>,
}

impl FakeFrontend {
    pub fn new(log: Arc<EventLog>) -> Arc<Self> {
        Arc::new(Self {
            log,
            status: Mutex::new(FeStatus::empty()),
            uncorrected: Mutex::new(VecDeque::new()),
            fail_set_frontend: Mutex::new(false),
        })
    }

    pub fn set_status(&self, status: FeStatus) {
        *self.status.lock() = status;
    }

    /// Values returned by successive uncorrected-block reads; 0 once drained.
    pub fn queue_uncorrected(&self, values: impl IntoIterator<Item = i32>) {
        self.uncorrected.lock().extend(values);
    }

    pub fn fail_set_frontend(&self, fail: bool) {
        *self.fail_set_frontend.lock() = fail;
    }
}

impl FrontendDevice for FakeFrontend {
    fn info(&self) -> io::Result<FrontendInfo> {
        Ok(FrontendInfo {
            name: "Fake DVB frontend".to_string(),
            kind: FrontendKind::Satellite,
            frequency_min: 950_000,
            frequency_max: 2_150_000,
        })
    }

    fn set_frontend(&self, params: &TuningParams) -> io::Result<()> {
        self.log.push(Event::SetFrontend(*params));
        if *self.fail_set_frontend.lock() {
            return Err(io::Error::from_raw_os_error(22));
        }
        Ok(())
    }

    fn read_status(&self) -> io::Result<FeStatus> {
        Ok(*self.status.lock())
    }

    fn read_uncorrected_blocks(&self) -> io::Result<i32> {
        Ok(self.uncorrected.lock().pop_front().unwrap_or(0))
    }

    fn set_tone(&self, tone: SecTone) -> io::Result<()> {
        self.log.push(Event::Tone(tone));
        Ok(())
    }

    fn set_voltage(&self, voltage: SecVoltage) -> io::Result<()> {
        self.log.push(Event::Voltage(voltage));
        Ok(())
    }

    fn send_diseqc(&self, message: &DiseqcMessage) -> io::Result<()> {
        self.log.push(Event::Diseqc(message.bytes().to_vec()));
        Ok(())
    }

    fn send_burst(&self, burst: MiniCommand) -> io::Result<()> {
        self.log.push(Event::Burst(burst));
        Ok(())
    }
}

struct NullDemux;

impl SectionDemux for NullDemux {
    fn set_filter(&mut self, _filter: &SectionFilter) -> io::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Table manager that registers one PAT filter and records every call.
pub struct RecordingTables {
    pub log: Arc<EventLog>,
}

impl TableManager for RecordingTables {
    fn add_default(&self, target: &TuningTarget) {
        self.log.push(Event::AddDefault(target.to_string()));
        target.add_table(TableFilter::new(
            "PAT",
            SectionFilter::for_table(0, 0),
            Box::new(NullDemux),
        ));
    }

    fn arm_pending(&self, target: &TuningTarget) {
        self.log.push(Event::Arm(target.to_string()));
        target.arm_pending_tables();
    }

    fn tear_down(&self, target: &TuningTarget) {
        self.log.push(Event::TearDown(target.to_string()));
        target.tear_down_tables();
    }
}

pub fn fast_timings() -> Timings {
    Timings {
        poll_interval: Duration::from_millis(10),
        lnb_settle: Duration::ZERO,
        tune_settle: Duration::ZERO,
        diseqc_gap: Duration::ZERO,
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
