//! 赞助状态机
//!
//! 状态流转以 trait 默认方法提供，任何暴露 `state` / `set_state` 的类型都可复用。
//! 流转本身只改状态字段，不做终态限制，也不触发通知；持久化由服务层负责。

use serde::{Deserialize, Serialize};

use crate::models::{SponsorshipState, StateTransition, Sponsorship};

/// 生命周期状态机
pub trait Lifecycle {
    fn state(&self) -> SponsorshipState;

    fn set_state(&mut self, state: SponsorshipState);

    /// 执行一次流转，返回流转前的状态
    fn apply(&mut self, transition: StateTransition) -> SponsorshipState {
        let previous = self.state();
        self.set_state(transition.target());
        previous
    }

    fn confirm(&mut self) -> SponsorshipState {
        self.apply(StateTransition::Confirm)
    }

    fn cancel(&mut self) -> SponsorshipState {
        self.apply(StateTransition::Cancel)
    }

    fn mark_contacted(&mut self) -> SponsorshipState {
        self.apply(StateTransition::MarkContacted)
    }

    fn mark_unconfirmed(&mut self) -> SponsorshipState {
        self.apply(StateTransition::MarkUnconfirmed)
    }

    /// 洽谈中
    fn in_negotiation(&self) -> bool {
        self.state() == SponsorshipState::Unconfirmed
    }
}

impl Lifecycle for Sponsorship {
    fn state(&self) -> SponsorshipState {
        self.state
    }

    fn set_state(&mut self, state: SponsorshipState) {
        self.state = state;
    }
}

/// 看板状态计数
///
/// 三个计数互相独立，已确认和已取消不计入任何一项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub to_contact: i64,
    pub contacted: i64,
    pub in_negotiations: i64,
}

impl StateCounts {
    /// 由按状态分组的计数结果汇总
    pub fn from_tally<I>(tally: I) -> Self
    where
        I: IntoIterator<Item = (SponsorshipState, i64)>,
    {
        tally
            .into_iter()
            .fold(Self::default(), |mut counts, (state, count)| {
                match state {
                    SponsorshipState::ToContact => counts.to_contact += count,
                    SponsorshipState::Contacted => counts.contacted += count,
                    SponsorshipState::Unconfirmed => counts.in_negotiations += count,
                    SponsorshipState::Confirmed | SponsorshipState::Canceled => {}
                }
                counts
            })
    }

    /// 由一组持有状态的对象逐个计数
    pub fn tally<'a, T, I>(items: I) -> Self
    where
        T: Lifecycle + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self::from_tally(items.into_iter().map(|item| (item.state(), 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_ignore_prior_state() {
        let mut sponsorship = Sponsorship::draft(1, None);

        sponsorship.cancel();
        assert_eq!(sponsorship.state, SponsorshipState::Canceled);

        // 已取消的记录仍可直接确认
        let previous = sponsorship.confirm();
        assert_eq!(previous, SponsorshipState::Canceled);
        assert_eq!(sponsorship.state, SponsorshipState::Confirmed);

        sponsorship.mark_contacted();
        assert_eq!(sponsorship.state, SponsorshipState::Contacted);

        sponsorship.mark_unconfirmed();
        assert!(sponsorship.in_negotiation());
    }

    #[test]
    fn test_lifecycle_for_other_owner_types() {
        struct Ticket(SponsorshipState);

        impl Lifecycle for Ticket {
            fn state(&self) -> SponsorshipState {
                self.0
            }
            fn set_state(&mut self, state: SponsorshipState) {
                self.0 = state;
            }
        }

        let mut ticket = Ticket(SponsorshipState::Confirmed);
        ticket.apply(StateTransition::MarkContacted);
        assert_eq!(ticket.state(), SponsorshipState::Contacted);
    }

    #[test]
    fn test_state_counts_from_tally() {
        let states = [
            SponsorshipState::ToContact,
            SponsorshipState::ToContact,
            SponsorshipState::Contacted,
            SponsorshipState::Unconfirmed,
            SponsorshipState::Unconfirmed,
            SponsorshipState::Unconfirmed,
            SponsorshipState::Confirmed,
            SponsorshipState::Canceled,
        ];
        let sponsorships: Vec<Sponsorship> = states
            .iter()
            .map(|state| Sponsorship {
                state: *state,
                ..Sponsorship::draft(1, None)
            })
            .collect();

        let counts = StateCounts::tally(&sponsorships);
        assert_eq!(
            counts,
            StateCounts {
                to_contact: 2,
                contacted: 1,
                in_negotiations: 3,
            }
        );
    }

    #[test]
    fn test_state_counts_ignore_terminal_states() {
        let counts = StateCounts::from_tally([
            (SponsorshipState::Confirmed, 5),
            (SponsorshipState::Canceled, 2),
        ]);
        assert_eq!(counts, StateCounts::default());
    }
}
