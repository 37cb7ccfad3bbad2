//! Cycle-accurate DRAM controller.
//!
//! The controller services memory requests one host cycle at a time. Each
//! tick runs a fixed pipeline:
//! 1. **Channel commands:** one ACTIVATE/COLUMN/PRECHARGE per channel, to the
//!    oldest command-ready bank.
//! 2. **Channel data:** grant the data bus to the oldest transfer-ready bank
//!    while the bus has capacity this cycle.
//! 3. **Bank completion:** retire banks whose data arrived, merging
//!    same-address pending entries and dispatching fills to the interconnect.
//! 4. **Bank selection:** give idle banks a new request via the scheduling
//!    policy; re-arm banks whose command latency elapsed.
//! 5. **Ingress:** drain at most one inbound request from the terminal.
//! 6. **Watchdog:** abort with a state dump if nothing retires for too long.
//!
//! Backpressure never blocks: a full buffer refuses the ingress and a
//! refused fill stays current and retries next tick.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::common::{Cycle, MemLevel, NodeId};
use crate::config::Config;
use crate::dram::bank::Bank;
use crate::dram::channel::Channel;
use crate::dram::decoder::AddressDecoder;
use crate::dram::drb::DramState;
use crate::dram::policy::{SchedulePolicy, make_policy};
use crate::mem::{MemReqKind, MemState, MemoryHierarchy, ReqId};
use crate::noc::{Interconnect, MsgKind};
use crate::stats::DramStats;

/// Consecutive no-progress cycles tolerated before the controller aborts.
pub const STARVATION_LIMIT: u64 = 5000;

/// Command latencies for one clock domain, in host cycles.
#[derive(Clone, Copy, Debug)]
struct DomainTiming {
    /// One DRAM cycle in this domain's host cycles.
    dram_cycle: f64,
    precharge: Cycle,
    activate: Cycle,
    column: Cycle,
}

impl DomainTiming {
    fn new(domain_freq: f64, dram_freq: f64, cfg: &Config) -> Self {
        let scale = domain_freq / dram_freq;
        Self {
            dram_cycle: scale,
            precharge: (cfg.dram.precharge as f64 * scale).round() as Cycle,
            activate: (cfg.dram.activate as f64 * scale).round() as Cycle,
            column: (cfg.dram.column as f64 * scale).round() as Cycle,
        }
    }
}

/// A DRAM memory controller: banks, channels, and their schedulers.
pub struct DramController {
    id: usize,
    noc_id: NodeId,
    num_channels: usize,
    banks_per_channel: usize,
    merge_enabled: bool,
    bug_file: String,

    decoder: AddressDecoder,
    policy: Box<dyn SchedulePolicy>,
    /// Indexed by `is_gpu`: CPU timing at 0, GPU timing at 1.
    timing: [DomainTiming; 2],
    clock: Arc<AtomicU64>,

    /// Bank state, indexed by decoded bank id.
    pub banks: Vec<Bank>,
    /// Channel data buses; bank `b` belongs to channel `b / banks_per_channel`.
    pub channels: Vec<Channel>,
    /// Performance counters.
    pub stats: DramStats,

    total_reqs: u64,
    completed_this_cycle: u64,
    starvation_cycles: u64,
}

impl DramController {
    /// Builds a controller from the configuration.
    ///
    /// `id` names the controller in logs and dumps, `noc_id` is its
    /// interconnect terminal, and `clock` is the host simulator's cycle
    /// counter, read at every scheduling decision.
    ///
    /// # Panics
    ///
    /// Panics when the bank count does not divide evenly across channels or
    /// a mask-width parameter is not a power of two.
    pub fn new(cfg: &Config, id: usize, noc_id: NodeId, clock: Arc<AtomicU64>) -> Self {
        let dram = &cfg.dram;
        assert!(dram.num_channels > 0, "need at least one channel");
        assert!(
            dram.num_banks % dram.num_channels == 0,
            "num_banks ({}) must divide evenly across num_channels ({})",
            dram.num_banks,
            dram.num_channels
        );

        let bus_width = dram.bus_width * dram.ddr_factor;
        let clocks = &cfg.clocks;

        Self {
            id,
            noc_id,
            num_channels: dram.num_channels,
            banks_per_channel: dram.num_banks / dram.num_channels,
            merge_enabled: dram.merge_requests,
            bug_file: dram.bug_file.clone(),
            decoder: AddressDecoder::new(cfg),
            policy: make_policy(dram.scheduler),
            timing: [
                DomainTiming::new(clocks.cpu_frequency, clocks.dram_frequency, cfg),
                DomainTiming::new(clocks.gpu_frequency, clocks.dram_frequency, cfg),
            ],
            clock,
            banks: (0..dram.num_banks).map(|_| Bank::new(dram.buffer_size)).collect(),
            channels: (0..dram.num_channels).map(|_| Channel::new(bus_width)).collect(),
            stats: DramStats::new(dram.num_channels),
            total_reqs: 0,
            completed_this_cycle: 0,
            starvation_cycles: 0,
        }
    }

    /// Current host cycle from the shared clock.
    #[inline]
    pub fn now(&self) -> Cycle {
        self.clock.load(Ordering::Relaxed)
    }

    /// Requests currently queued or in flight in this controller.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_reqs
    }

    /// Consecutive cycles the watchdog has seen no request retire.
    #[inline]
    pub fn starvation_cycles(&self) -> u64 {
        self.starvation_cycles
    }

    /// Accepts a request into the buffer of its decoded bank.
    ///
    /// Returns `false` when the bank's buffer is full even after flushing
    /// its hardware prefetches; the caller retries on a later cycle.
    pub fn insert_new_req(&mut self, req_id: ReqId, mem: &mut dyn MemoryHierarchy) -> bool {
        let addr = mem.req(req_id).addr;
        let dec = self.decoder.decode(addr);
        let bank_id = dec.bank;

        if self.banks[bank_id].drb.is_full() {
            self.flush_prefetch(bank_id, mem);
            if self.banks[bank_id].drb.is_full() {
                return false;
            }
        }

        let now = self.now();
        let idx = self.banks[bank_id]
            .drb
            .try_acquire()
            .expect("free list empty after full check");
        {
            let req = mem.req(req_id);
            self.banks[bank_id].drb.entry_mut(idx).assign(req_id, req, &dec, now);
        }
        self.banks[bank_id].drb.push_pending(idx);

        self.stats.total_requests += 1;
        self.stats.power_writes += 1;
        self.total_reqs += 1;
        mem.req_mut(req_id).state = MemState::DramStart;

        debug!(
            "mc[{}] new req {} bank:{} row:{} col:{}",
            self.id, mem.req(req_id).id, bank_id, dec.row, dec.column
        );
        true
    }

    /// Evicts every pending hardware prefetch from a bank, returning the
    /// underlying requests to the pool.
    fn flush_prefetch(&mut self, bank_id: usize, mem: &mut dyn MemoryHierarchy) {
        let victims: Vec<usize> = {
            let drb = &self.banks[bank_id].drb;
            drb.pending()
                .filter(|&i| drb.entry(i).req_kind().is_flushable_prefetch())
                .collect()
        };

        for idx in victims {
            let (req_id, core_id) = {
                let e = self.banks[bank_id].drb.entry(idx);
                (e.req.expect("pending entry without request"), e.core_id)
            };
            mem.free_req(core_id, req_id);
            self.banks[bank_id].drb.remove_pending(idx);
            self.banks[bank_id].drb.release(idx);
            self.total_reqs -= 1;
            debug!("mc[{}] flushed prefetch from bank {}", self.id, bank_id);
        }
    }

    /// Advances the controller by one host cycle.
    pub fn run_a_cycle(&mut self, mem: &mut dyn MemoryHierarchy, noc: &mut dyn Interconnect) {
        self.channel_schedule_cmd(mem);
        self.channel_schedule_data(mem);
        self.bank_schedule_complete(mem, noc);
        self.bank_schedule_new();
        self.drain_inbound(mem, noc);
        self.progress_check();

        let now = self.now();
        for ch in 0..self.num_channels {
            if self.channels[ch].bus_free(now) {
                self.stats.dbus_idle[ch] += 1;
            }
        }
    }

    /// Bank ids belonging to a channel.
    #[inline]
    fn channel_banks(&self, ch: usize) -> std::ops::Range<usize> {
        ch * self.banks_per_channel..(ch + 1) * self.banks_per_channel
    }

    /// Issues at most one DRAM command per channel to its oldest waiter.
    fn channel_schedule_cmd(&mut self, mem: &mut dyn MemoryHierarchy) {
        let now = self.now();
        for ch in 0..self.num_channels {
            let mut oldest: Option<(Cycle, usize)> = None;
            for b in self.channel_banks(ch) {
                if self.banks[b].current_in(DramState::Cmd)
                    && oldest.is_none_or(|(t, _)| self.banks[b].last_cmd_at < t)
                {
                    oldest = Some((self.banks[b].last_cmd_at, b));
                }
            }
            if let Some((_, bank_id)) = oldest {
                self.issue_command(bank_id, now, mem);
            }
        }
    }

    /// Issues the next sub-command for a bank's current entry.
    ///
    /// ACTIVATE when no row is open, COLUMN on a row hit, PRECHARGE on a
    /// conflict. Latencies come from the requester's clock domain.
    fn issue_command(&mut self, bank_id: usize, now: Cycle, mem: &mut dyn MemoryHierarchy) {
        let (cur, req_id, entry_id, is_gpu, row) = {
            let bank = &self.banks[bank_id];
            let cur = bank.current.expect("command issue on an idle bank");
            let e = bank.drb.entry(cur);
            assert_eq!(e.state, DramState::Cmd, "command issue outside CMD");
            (
                cur,
                e.req.expect("current entry without request"),
                e.id,
                e.is_gpu,
                e.row_id,
            )
        };
        let t = self.timing[is_gpu as usize];
        mem.req_mut(req_id).state = MemState::DramCmd;

        let bank = &mut self.banks[bank_id];
        match bank.open_row {
            None => {
                bank.open_row = Some(row);
                bank.bank_ready = Some(now + t.activate);
                bank.data_avail = None;
                bank.drb.entry_mut(cur).state = DramState::CmdWait;
                self.stats.activates += 1;
                debug!("bank[{bank_id}] entry {entry_id} activate row {row}");
            }
            Some(open) if open == row => {
                let ready = now + t.column;
                bank.bank_ready = Some(ready);
                bank.data_avail = Some(ready);
                bank.drb.entry_mut(cur).state = DramState::Data;
                self.stats.columns += 1;
                debug!("bank[{bank_id}] entry {entry_id} column access");
            }
            Some(_) => {
                bank.open_row = None;
                bank.bank_ready = Some(now + t.precharge);
                bank.data_avail = None;
                bank.drb.entry_mut(cur).state = DramState::CmdWait;
                self.stats.precharges += 1;
                debug!("bank[{bank_id}] entry {entry_id} precharge");
            }
        }
        bank.last_cmd_at = now;
    }

    /// Oldest bank on a channel whose column data is eligible for the bus.
    fn transfer_ready_bank(&self, ch: usize, now: Cycle) -> Option<usize> {
        let mut oldest: Option<(Cycle, usize)> = None;
        for b in self.channel_banks(ch) {
            let bank = &self.banks[b];
            if bank.current_in(DramState::Data)
                && bank.data_avail.is_some_and(|c| c <= now)
                && oldest.is_none_or(|(t, _)| bank.last_cmd_at < t)
            {
                oldest = Some((bank.last_cmd_at, b));
            }
        }
        oldest.map(|(_, b)| b)
    }

    /// Hands each channel's data bus to transfer-ready banks.
    ///
    /// Several sub-bus-width transfers can be granted in the same cycle;
    /// a full-width transfer occupies the bus until its release cycle.
    fn channel_schedule_data(&mut self, mem: &mut dyn MemoryHierarchy) {
        let now = self.now();
        for ch in 0..self.num_channels {
            if !self.channels[ch].bus_free(now) && self.transfer_ready_bank(ch, now).is_some() {
                self.stats.bandwidth_saturated[ch] += 1;
            }

            while self.channels[ch].bus_free(now) {
                let Some(bank_id) = self.transfer_ready_bank(ch, now) else {
                    break;
                };
                let (cur, req_id, entry_id, is_gpu, size) = {
                    let e = self.banks[bank_id].current_entry().expect("transfer-ready bank");
                    (
                        self.banks[bank_id].current.unwrap(),
                        e.req.expect("current entry without request"),
                        e.id,
                        e.is_gpu,
                        e.size,
                    )
                };
                let t = self.timing[is_gpu as usize];
                mem.req_mut(req_id).state = MemState::DramData;

                let release = self.channels[ch].acquire(now, size as u64, t.dram_cycle);
                self.stats.bandwidth_bytes += size as u64;

                let bank = &mut self.banks[bank_id];
                bank.data_ready = Some(release);
                bank.data_avail = None;
                bank.drb.entry_mut(cur).state = DramState::DataWait;
                debug!("bank[{bank_id}] entry {entry_id} data bus held until {release}");
            }
        }
    }

    /// Retires banks whose data transfer has completed.
    fn bank_schedule_complete(&mut self, mem: &mut dyn MemoryHierarchy, noc: &mut dyn Interconnect) {
        self.completed_this_cycle = 0;
        let now = self.now();

        for bank_id in 0..self.banks.len() {
            let Some(cur) = self.banks[bank_id].current else {
                continue;
            };
            if !self.banks[bank_id].data_ready.is_some_and(|c| c <= now) {
                continue;
            }
            assert!(
                self.banks[bank_id].current_in(DramState::DataWait),
                "data ready outside DATA_WAIT"
            );

            if self.merge_enabled && !self.complete_merged(bank_id, cur, mem, noc) {
                // A merge sibling hit backpressure: retry the rest next tick.
                continue;
            }

            let (req_id, core_id, kind, dst_cache, inserted_at) = {
                let e = self.banks[bank_id].drb.entry(cur);
                (
                    e.req.expect("current entry without request"),
                    e.core_id,
                    e.req_kind(),
                    e.dst_cache_id,
                    e.inserted_at,
                )
            };

            // Writebacks retire internally; everything else returns a fill.
            if kind == MemReqKind::Wb {
                mem.free_req(core_id, req_id);
            } else if !self.send_fill(req_id, dst_cache, mem, noc) {
                continue;
            }

            self.stats.record_latency(now - inserted_at);
            let bank = &mut self.banks[bank_id];
            bank.drb.release(cur);
            bank.current = None;
            bank.data_ready = None;
            self.completed_this_cycle += 1;
            self.total_reqs -= 1;
            debug!("mc[{}] bank[{bank_id}] request done", self.id);
        }
    }

    /// Completes pending entries matching the primary's address.
    ///
    /// Returns `false` when the interconnect refused a sibling fill; the
    /// siblings already dispatched stay completed, the refused one and
    /// everything after it remain pending, and the caller defers the
    /// primary to the next tick.
    fn complete_merged(
        &mut self,
        bank_id: usize,
        cur: usize,
        mem: &mut dyn MemoryHierarchy,
        noc: &mut dyn Interconnect,
    ) -> bool {
        let addr = self.banks[bank_id].drb.entry(cur).addr;
        let siblings: Vec<usize> = {
            let drb = &self.banks[bank_id].drb;
            drb.pending().filter(|&i| drb.entry(i).addr == addr).collect()
        };

        for idx in siblings {
            let (req_id, core_id, kind, dst_cache) = {
                let e = self.banks[bank_id].drb.entry(idx);
                (
                    e.req.expect("pending entry without request"),
                    e.core_id,
                    e.req_kind(),
                    e.dst_cache_id,
                )
            };

            if kind == MemReqKind::Wb {
                mem.free_req(core_id, req_id);
            } else if !self.send_fill(req_id, dst_cache, mem, noc) {
                return false;
            }

            self.banks[bank_id].drb.remove_pending(idx);
            self.banks[bank_id].drb.release(idx);
            self.stats.merged_requests += 1;
            self.completed_this_cycle += 1;
            self.total_reqs -= 1;
            debug!("mc[{}] bank[{bank_id}] merged request done", self.id);
        }
        true
    }

    /// Dispatches a fill toward the request's L3 home slice.
    ///
    /// Returns `false` on interconnect backpressure; the request is left
    /// untouched for a retry.
    fn send_fill(
        &mut self,
        req_id: ReqId,
        dst_cache: u32,
        mem: &mut dyn MemoryHierarchy,
        noc: &mut dyn Interconnect,
    ) -> bool {
        let dst = mem.dst_id(MemLevel::L3, dst_cache);
        if !noc.insert(self.noc_id, dst, MsgKind::Fill, req_id) {
            debug!("mc[{}] fill for req {} refused, noc busy", self.id, mem.req(req_id).id);
            return false;
        }
        mem.req_mut(req_id).state = MemState::DramDone;
        true
    }

    /// Gives idle banks a new request and re-arms elapsed command waits.
    fn bank_schedule_new(&mut self) {
        let now = self.now();
        for bank_id in 0..self.banks.len() {
            let bank = &mut self.banks[bank_id];
            match bank.current {
                None => {
                    if bank.drb.pending_empty() {
                        continue;
                    }
                    let idx = self.policy.select(&mut bank.drb, bank.open_row);
                    bank.drb.remove_pending(idx);
                    bank.current = Some(idx);
                    bank.bank_ready = None;
                    bank.last_cmd_at = now;
                    let e = bank.drb.entry_mut(idx);
                    e.state = DramState::Cmd;
                    e.scheduled_at = now;
                    let entry_id = e.id;
                    self.stats.power_reads += 1;
                    debug!("bank[{bank_id}] entry {entry_id} selected");
                }
                Some(cur) => {
                    // Command latency elapsed: ready for the next sub-command.
                    if bank.drb.entry(cur).state == DramState::CmdWait
                        && bank.bank_ready.is_some_and(|c| c <= now)
                    {
                        bank.bank_ready = None;
                        bank.drb.entry_mut(cur).state = DramState::Cmd;
                        bank.last_cmd_at = now;
                    }
                }
            }
        }
    }

    /// Drains at most one inbound request from the controller's terminal.
    fn drain_inbound(&mut self, mem: &mut dyn MemoryHierarchy, noc: &mut dyn Interconnect) {
        if let Some(req_id) = noc.inbound(self.noc_id) {
            if self.insert_new_req(req_id, mem) {
                noc.pop_inbound(self.noc_id);
            }
        }
    }

    /// Starvation watchdog: abort when requests exist but nothing retires.
    fn progress_check(&mut self) {
        if self.total_reqs > 0 && self.completed_this_cycle == 0 {
            self.starvation_cycles += 1;
        } else {
            self.starvation_cycles = 0;
        }

        if self.starvation_cycles >= STARVATION_LIMIT {
            self.dump_state();
            panic!(
                "mc[{}]: no request retired for {} cycles ({} outstanding), state dumped to {}",
                self.id, self.starvation_cycles, self.total_reqs, self.bug_file
            );
        }
    }

    /// Writes the full scheduling state to the diagnostic file.
    pub fn dump_state(&self) {
        let file = match File::create(&self.bug_file) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("mc[{}]: cannot write {}: {}", self.id, self.bug_file, e);
                return;
            }
        };
        let mut out = BufWriter::new(file);
        let fmt = |c: Option<Cycle>| c.map_or("-".to_string(), |v| v.to_string());

        let _ = writeln!(out, "Current cycle:{}", self.now());
        let _ = writeln!(out, "Total req:{}", self.total_reqs);
        let _ = writeln!(out, "\nData bus");
        for (ch, channel) in self.channels.iter().enumerate() {
            let _ = writeln!(out, "DBUS[{ch}] bus_ready:{}", channel.dbus_ready);
        }

        let _ = writeln!(out, "\nEach bank");
        for (b, bank) in self.banks.iter().enumerate() {
            let (cur_id, scheduled, state) = match bank.current_entry() {
                Some(e) => (e.id as i64, e.scheduled_at, e.state.name()),
                None => (-1, 0, "NULL"),
            };
            let _ = writeln!(
                out,
                "bank[{b}] current:{cur_id:<10} scheduled:{scheduled} size:{:<5} state:{state:<15} \
                 bank_ready:{} data_ready:{} data_avail:{} time:{}",
                bank.drb.pending_len(),
                fmt(bank.bank_ready),
                fmt(bank.data_ready),
                fmt(bank.data_avail),
                bank.last_cmd_at,
            );
        }
    }
}
