use crate::session::IkeSa;
use sbus::{Bus, SessionRef, Signal, dbg1, dbg2, dbg4, sig};
use std::sync::Arc;

/// Negotiates `ids` one after another on the calling thread.
///
/// Every `fail_every`-th session (by id) fails to come up; zero never fails.
pub(crate) fn negotiate(bus: &Bus, ids: impl IntoIterator<Item = u32>, fail_every: u32) {
    for id in ids {
        let sa = Arc::new(IkeSa::new(id));
        let unreachable = fail_every != 0 && id % fail_every == 0;

        bus.set_session(Some(SessionRef::new(&sa)));
        establish(bus, &sa, unreachable);
        bus.set_session(None);
    }
}

fn establish(bus: &Bus, sa: &IkeSa, unreachable: bool) {
    sig!(bus, Signal::IkeUpStart, "initiating IKE_SA to {}", sa.remote().ip());
    dbg2!(bus, Signal::Net, "sending packet: from {} to {}", sa.local(), sa.remote());

    if unreachable {
        dbg1!(bus, Signal::Ike, "giving up after {} retransmits", 5_u8);
        sig!(bus, Signal::IkeUpFailed, "establishing IKE_SA failed, peer not responding");
        return;
    }

    dbg2!(bus, Signal::Net, "received packet: from {} to {}", sa.remote(), sa.local());
    dbg4!(bus, Signal::Ike, "shared Diffie Hellman secret {}", sa.shared_secret());
    sig!(
        bus,
        Signal::IkeUpSuccess,
        "IKE_SA established between {} and {}",
        sa.local().ip(),
        sa.remote().ip()
    );

    sig!(bus, Signal::ChildUpStart, "installing CHILD_SA");
    dbg1!(bus, Signal::Knl, "adding SAD entry with SPI {}", format!("{:08x}", sa.spi()));
    sig!(bus, Signal::ChildUpSuccess, "CHILD_SA established");
}
