/*!
 * Timer Programming.
 *
 * All timer messages share a head of seven bytes:
 * day, month, start hour and minute (BCD), duration hours and minutes (BCD)
 * and the recording sequence. The record source follows.
 */
use super::Ctx;
use crate::{
    message::{Message, Operands},
    operand::{
        from_bcd, AnalogueService, DigitalServiceId, MediaInfo, ProgrammedError, ProgrammedInfo,
        RecordSource, TimerClearedStatus, TimerStatusData,
    },
    timer::{Insert, Timer},
    types::{CecAbortReason, CecLogAddrType, CecOpcode, DeckInfo, RecordingSequence},
};
use log::{debug, info};
use std::time::{Duration, SystemTime};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// External Source Specifier of Set/Clear External Timer
const EXT_PLUG: u8 = 4;
const EXT_PHYS_ADDR: u8 = 5;

/// A timer message as received
#[derive(Debug, Clone, Copy)]
struct Job {
    day: u8,
    month: u8,
    hour: u8,
    minute: u8,
    duration: Duration,
    recording_seq: u8,
    source: RecordSource,
}

impl Job {
    fn parse(msg: &Message, op: CecOpcode) -> Result<Self, CecAbortReason> {
        let mut ops = msg.operands();
        let day = ops.u8()?;
        let month = ops.u8()?;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            return Err(CecAbortReason::InvalidOp);
        }
        let hour = from_bcd(ops.u8()?, 23)?;
        let minute = from_bcd(ops.u8()?, 59)?;
        let dur_h = from_bcd(ops.u8()?, 99)?;
        let dur_m = from_bcd(ops.u8()?, 59)?;
        let duration = Duration::from_secs((dur_h as u64 * 60 + dur_m as u64) * 60);
        if duration.is_zero() {
            return Err(CecAbortReason::InvalidOp);
        }
        let recording_seq = ops.u8()?;
        let source = Self::source(&mut ops, op)?;
        Ok(Self {
            day,
            month,
            hour,
            minute,
            duration,
            recording_seq,
            source,
        })
    }

    fn source(ops: &mut Operands, op: CecOpcode) -> Result<RecordSource, CecAbortReason> {
        Ok(match op {
            CecOpcode::SetAnalogueTimer | CecOpcode::ClearAnalogueTimer => {
                RecordSource::Analogue(AnalogueService::parse(ops)?)
            }
            CecOpcode::SetDigitalTimer | CecOpcode::ClearDigitalTimer => {
                RecordSource::Digital(DigitalServiceId::parse(ops)?)
            }
            _ => {
                let specifier = ops.u8()?;
                let plug = ops.u8()?;
                let phys = ops.u16()?;
                match specifier {
                    EXT_PLUG => RecordSource::ExtPlug(plug),
                    EXT_PHYS_ADDR => RecordSource::ExtPhysAddr(phys),
                    _ => return Err(CecAbortReason::InvalidOp),
                }
            }
        })
    }

    /// Absolute start in UTC. A month before the current one is next year.
    fn start(&self, now: SystemTime) -> Option<SystemTime> {
        let today = OffsetDateTime::from(now);
        let month = Month::try_from(self.month).ok()?;
        let year = if u8::from(month) < u8::from(today.month()) {
            today.year() + 1
        } else {
            today.year()
        };
        let date = Date::from_calendar_date(year, month, self.day).ok()?;
        let time = Time::from_hms(self.hour, self.minute, 0).ok()?;
        Some(PrimitiveDateTime::new(date, time).assume_utc().into())
    }
}

/// hours and minutes, as sent in Duration Available
fn hours_minutes(minutes: u32) -> (u8, u8) {
    ((minutes / 60).min(99) as u8, (minutes % 60) as u8)
}

fn timer_status(ctx: &mut Ctx, msg: &Message, status: TimerStatusData) {
    debug!("timer status {:?}", status);
    ctx.reply(msg, CecOpcode::TimerStatus, &status.encode());
}

fn set_timer(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    let job = Job::parse(msg, op)?;
    let space = ctx.state.record.media_space;
    let mut status = TimerStatusData {
        overlap_warning: false,
        media_info: if ctx.state.deck.info == DeckInfo::NoMedia {
            MediaInfo::NoMedia
        } else {
            MediaInfo::UnprotMedia
        },
        programmed: Ok(ProgrammedInfo::EnoughSpace),
        duration_available: None,
    };
    let start = job.start(ctx.now);
    let error = if job.recording_seq & 0x80 != 0 {
        Some(ProgrammedError::RecSeqError)
    } else if job.source == RecordSource::ExtPlug(0) {
        Some(ProgrammedError::InvExtPlug)
    } else if job.source == RecordSource::ExtPhysAddr(0xffff) {
        Some(ProgrammedError::InvExtPhysAddr)
    } else if start.map_or(true, |s| s + job.duration <= ctx.now) {
        Some(ProgrammedError::DateOutOfRange)
    } else {
        None
    };
    let (Some(start), None) = (start, error) else {
        status.programmed = Err(error.unwrap_or(ProgrammedError::DateOutOfRange));
        timer_status(ctx, msg, status);
        return Ok(());
    };

    let timer = Timer {
        start,
        duration: job.duration,
        recording_seq: RecordingSequence::from_bits_truncate(job.recording_seq),
        source: job.source,
    };
    match ctx.timers.insert(timer) {
        Insert::Conflict(existing) => {
            info!("timer for {:?} conflicts with {:?}", timer.start, existing.start);
            status.overlap_warning = true;
            status.programmed = Err(if existing == timer {
                ProgrammedError::Duplicate
            } else {
                ProgrammedError::NoFreeTimer
            });
            status.duration_available = Some(hours_minutes(space));
        }
        Insert::Accepted => {
            info!("timer programmed for {:?}, {:?}", timer.start, timer.duration);
            let needed = (timer.duration.as_secs() / 60) as u32;
            let total = (ctx.timers.total_duration().as_secs() / 60) as u32;
            status.programmed = Ok(if space == 0 {
                ProgrammedInfo::NoneAvailable
            } else if needed > space {
                ProgrammedInfo::NotEnoughSpace
            } else if total > space {
                ProgrammedInfo::MightNotBeEnoughSpace
            } else {
                ProgrammedInfo::EnoughSpace
            });
            status.duration_available = Some(hours_minutes(space));
        }
    }
    timer_status(ctx, msg, status);
    Ok(())
}

fn clear_timer(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    let job = Job::parse(msg, op)?;
    let removed = job
        .start(ctx.now)
        .and_then(|start| ctx.timers.remove(start, job.duration, &job.source));
    let cleared = match removed {
        Some(timer) => {
            info!("timer for {:?} cleared", timer.start);
            let rec = &mut ctx.state.record;
            if rec.controlled_by_timer && timer.is_running(ctx.now) {
                rec.recording = false;
                rec.controlled_by_timer = false;
                ctx.state.tuner.info.rec_flag = false;
                info!("timer recording stopped");
            }
            TimerClearedStatus::Cleared
        }
        None => TimerClearedStatus::NoMatching,
    };
    ctx.reply(msg, CecOpcode::TimerClearedStatus, &[cleared.into()]);
    Ok(())
}

pub(super) fn process(ctx: &mut Ctx, msg: &Message, op: CecOpcode) -> Result<(), CecAbortReason> {
    match op {
        CecOpcode::TimerStatus | CecOpcode::TimerClearedStatus => Ok(()),
        _ if !ctx.is(CecLogAddrType::RECORD) => Err(CecAbortReason::Unrecognized),
        CecOpcode::SetAnalogueTimer | CecOpcode::SetDigitalTimer | CecOpcode::SetExtTimer => {
            set_timer(ctx, msg, op)
        }
        CecOpcode::ClearAnalogueTimer
        | CecOpcode::ClearDigitalTimer
        | CecOpcode::ClearExtTimer => clear_timer(ctx, msg, op),
        CecOpcode::SetTimerProgramTitle => {
            let title = msg.operands().rest();
            if title.is_empty() {
                return Err(CecAbortReason::InvalidOp);
            }
            debug!("program title {:?}", String::from_utf8_lossy(title));
            Ok(())
        }
        _ => Err(CecAbortReason::Unrecognized),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::types::{CecLogAddrType, CecLogicalAddress};

    /// Set Analogue Timer on 2024-01-01 at `hh:mm` (BCD) for `dh:dm` (BCD)
    fn analogue(op: u8, hh: u8, mm: u8, dh: u8, dm: u8, freq: u16) -> Vec<u8> {
        let [hi, lo] = freq.to_be_bytes();
        vec![0x01, op, 1, 1, hh, mm, dh, dm, 0x00, 0x00, hi, lo, 0x00]
    }

    #[test]
    fn overlapping_timer_conflicts() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        let out = r.process(&msg(&analogue(0x34, 0x10, 0x00, 0x00, 0x30, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x18]]);
        assert_eq!(r.timers().len(), 1);
        let first = *r.timers().iter().next().unwrap();

        let out = r.process(&msg(&analogue(0x34, 0x10, 0x15, 0x00, 0x30, 2804)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x80 | 0x01]]);
        assert_eq!(r.timers().len(), 1);
        assert_eq!(r.timers().iter().next(), Some(&first));
        assert_eq!(first.source, r.timers().iter().next().unwrap().source);

        // same job again
        let out = r.process(&msg(&analogue(0x34, 0x10, 0x00, 0x00, 0x30, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x80 | 0x0e, 0x10, 0x00]]);
    }

    #[test]
    fn past_and_invalid_dates() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        // 2024-01-01 01:00 to 01:30 is over at 02:00
        let out = r.process(
            &msg(&analogue(0x34, 0x01, 0x00, 0x00, 0x30, 7540)),
            t(2 * 3600 * 1000),
        );
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x02]]);
        // bad BCD minute
        let out = r.process(&msg(&analogue(0x34, 0x10, 0x6a, 0x00, 0x30, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x00, 0x34, 0x03]]);
        // february 30th
        let out = r.process(
            &msg(&[0x01, 0x34, 30, 2, 0x10, 0x00, 0x00, 0x30, 0x00, 0x00, 0x1d, 0x74, 0x00]),
            t(0),
        );
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x02]]);
        assert!(r.timers().is_empty());
    }

    #[test]
    fn external_timer_checks() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        let head = [0x01, 0xa2, 1, 1, 0x10, 0x00, 0x01, 0x00, 0x00];
        let mut plug0 = head.to_vec();
        plug0.extend_from_slice(&[4, 0, 0x10, 0x00]);
        let out = r.process(&msg(&plug0), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x04]]);

        let mut bad_seq = head.to_vec();
        bad_seq[8] = 0x80;
        bad_seq.extend_from_slice(&[4, 1, 0x10, 0x00]);
        let out = r.process(&msg(&bad_seq), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x03]]);

        let mut phys = head.to_vec();
        phys.extend_from_slice(&[5, 0, 0x21, 0x00]);
        let out = r.process(&msg(&phys), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x18]]);
    }

    #[test]
    fn space_warnings() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        // 11 hours do not fit into 10
        let out = r.process(&msg(&analogue(0x34, 0x10, 0x00, 0x11, 0x00, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x19, 0x10, 0x00]]);
        // fits alone but not with the first one
        let out = r.process(&msg(&analogue(0x34, 0x22, 0x00, 0x01, 0x00, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x35, 0x1b, 0x10, 0x00]]);
    }

    #[test]
    fn clear_timer() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        r.process(&msg(&analogue(0x34, 0x10, 0x00, 0x00, 0x30, 7540)), t(0));
        let out = r.process(&msg(&analogue(0x33, 0x10, 0x00, 0x00, 0x30, 2804)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x43, 0x01]]);
        let out = r.process(&msg(&analogue(0x33, 0x10, 0x00, 0x00, 0x30, 7540)), t(0));
        assert_eq!(bytes(&out), vec![vec![0x10, 0x43, 0x80]]);
        assert!(r.timers().is_empty());
    }

    #[test]
    fn timer_recording_runs_and_uses_space() {
        let mut r = follower(CecLogicalAddress::Record1, CecLogAddrType::RECORD);
        r.process(&msg(&analogue(0x34, 0x10, 0x00, 0x00, 0x30, 7540)), t(0));
        let ten = 10 * 3600 * 1000;
        r.poll(t(ten - 1000));
        assert!(!r.state().record.recording);
        r.poll(t(ten + 1000));
        assert!(r.state().record.recording);
        assert!(r.state().record.controlled_by_timer);
        r.process(&msg(&[0x0f, 0x36]), t(ten + 2000));
        assert!(r.state().power.is_on());
        r.poll(t(ten + 31 * 60 * 1000));
        assert!(!r.state().record.recording);
        assert!(!r.state().power.is_on());
        assert_eq!(r.state().record.media_space, 600 - 30);
        assert!(r.timers().is_empty());
    }

    #[test]
    fn only_recorders_have_timers() {
        let mut p = follower(CecLogicalAddress::Playback1, CecLogAddrType::PLAYBACK);
        let out = p.process(&msg(&[0x04, 0x34, 1, 1, 0x10, 0, 0, 0x30, 0, 0, 0x1d, 0x74, 0]), t(0));
        assert_eq!(bytes(&out), vec![vec![0x40, 0x00, 0x34, 0x00]]);
    }
}
