pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use sbus::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_passive_fan_out() {
        let bus = Bus::new();
        let listeners: Vec<_> = (0..3).map(|_| Capture::new()).collect();
        for listener in &listeners {
            bus.add_listener(listener);
        }

        bus.signal(Signal::Cfg, Level::CTRLMORE, message!("loaded {} conns", 4_u32));

        let expected = Seen {
            signal: Signal::Cfg,
            level: Level::CTRLMORE,
            thread: current_thread_id(),
            session: None,
            template: "loaded {} conns".into(),
            text: "loaded 4 conns".into(),
        };
        for listener in &listeners {
            assert_eq!(listener.seen(), [expected.clone()]);
        }
    }

    #[test]
    fn test_silent_is_never_delivered() {
        let bus = Bus::new();
        let capture = Capture::new();
        bus.add_listener(&capture);

        bus.signal(Signal::Knl, Level::Silent, Message::text("dropped"));
        bus.vsignal(Signal::Knl, Level::Silent, "dropped {}", vec![Arg::from(1_u8)]);

        let _guard = bus.listening();
        bus.signal(Signal::Knl, Level::Silent, Message::text("dropped"));
        assert_eq!(capture.len(), 0);
    }

    #[test]
    fn test_silent_vsignal_skips_message_validation() {
        let bus = Bus::new();
        bus.vsignal(Signal::Net, Level::Silent, "{} {}", vec![]);
    }

    #[test]
    fn test_vsignal_matches_signal() {
        let bus = Bus::new();
        let capture = Capture::new();
        bus.add_listener(&capture);

        bus.signal(Signal::Enc, Level::RAW, message!("{} of {}", "block", 16_usize));
        bus.vsignal(Signal::Enc, Level::RAW, "{} of {}", vec!["block".into(), 16_usize.into()]);

        let seen = capture.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[test]
    fn test_macros_fix_levels() {
        let bus = Bus::new();
        let capture = Capture::new();
        bus.add_listener(&capture);

        sig!(bus, Signal::ChildUpStart, "start");
        dbg1!(bus, Signal::Chd, "one");
        dbg2!(bus, Signal::Chd, "two {}", 2_i32);
        dbg3!(bus, Signal::Chd, "three {}", "raw");
        dbg4!(bus, Signal::Chd, "key {}", vec![0xde_u8, 0xad]);

        let levels: Vec<_> = capture.seen().iter().map(|s| s.level).collect();
        assert_eq!(levels, [Level::L0, Level::L1, Level::L2, Level::L3, Level::L4]);
        assert_eq!(capture.seen()[4].text, "key dead");
    }

    #[test]
    #[should_panic(expected = "invalid signal message")]
    fn test_argument_mismatch_panics() {
        let bus = Bus::new();
        dbg1!(bus, Signal::Lib, "{} and {}", 1_i32);
    }

    #[test]
    fn test_session_propagates_per_thread() {
        let bus = Bus::new();
        let capture = Capture::new();
        bus.add_listener(&capture);
        let conn = TestSession::new("home", 7);

        bus.set_session(Some(SessionRef::new(&conn)));
        assert!(bus.session().is_some_and(|s| s.refers_to(&conn)));
        sig!(bus, Signal::IkeUpStart, "initiating");
        dbg1!(bus, Signal::Ike, "sending");

        thread::scope(|s| {
            s.spawn(|| dbg1!(bus, Signal::Job, "other thread"));
        });

        bus.set_session(None);
        dbg1!(bus, Signal::Ike, "released");

        let sessions: Vec<_> = capture.seen().into_iter().map(|s| s.session).collect();
        assert_eq!(
            sessions,
            [Some("home[7]".to_owned()), Some("home[7]".to_owned()), None, None]
        );
    }

    #[test]
    fn test_session_is_not_kept_alive() {
        let bus = Bus::new();
        let capture = Capture::new();
        bus.add_listener(&capture);

        let conn = TestSession::new("gone", 1);
        bus.set_session(Some(SessionRef::from(&conn)));
        drop(conn);
        dbg1!(bus, Signal::Ike, "after release");

        assert_eq!(capture.seen()[0].session, None);
        bus.set_session(None);
    }

    #[test]
    fn test_removed_and_dropped_listeners_stop_receiving() {
        let bus = Bus::new();
        let kept = Capture::new();
        let removed = Capture::new();
        let dropped = Capture::new();
        bus.add_listener(&kept);
        bus.add_listener(&removed);
        bus.add_listener(&dropped);
        assert_eq!(bus.listener_count(), 3);

        assert!(bus.remove_listener(&removed));
        drop(dropped);
        dbg1!(bus, Signal::Mgr, "tick");

        assert_eq!(kept.len(), 1);
        assert_eq!(removed.len(), 0);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let bus = Bus::new();
        let late = Capture::new();
        let registrar = {
            let bus = bus.clone();
            let late = Arc::clone(&late);
            Arc::new(move |_: &Record| bus.add_listener(&late))
        };
        bus.add_listener(&registrar);

        dbg1!(bus, Signal::Dmn, "first");
        assert_eq!(late.len(), 0);
        assert!(bus.remove_listener(&registrar));

        dbg1!(bus, Signal::Dmn, "second");
        assert_eq!(late.len(), 1);
    }

    #[test]
    fn test_audit_lifecycle_scenario() {
        let bus = Bus::new();
        let l1 = Capture::new();
        let l2 = Capture::new();
        bus.add_listener(&l1);
        bus.add_listener(&l2);
        let producer = current_thread_id();

        sig!(bus, Signal::IkeUpStart, "start");
        for listener in [&l1, &l2] {
            let seen = listener.seen();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].signal, Signal::IkeUpStart);
            assert_eq!(seen[0].level, Level::AUDIT);
            assert_eq!(seen[0].thread, producer);
            assert_eq!(seen[0].session, None);
            assert_eq!(seen[0].template, "start");
        }

        let b = {
            let bus = bus.clone();
            thread::spawn(move || {
                bus.set_listen_state(true);
                let record = bus.listen();
                bus.set_listen_state(false);
                Seen::from(&record)
            })
        };
        wait_for_active(&bus, 1);

        sig!(bus, Signal::IkeUpSuccess, "ok");

        let received = b.join().unwrap();
        assert_eq!(received.signal, Signal::IkeUpSuccess);
        assert_eq!(received.level, Level::AUDIT);
        assert_eq!(received.thread, producer);
        assert_eq!(received.template, "ok");
        assert_eq!(l1.len(), 2);
        assert_eq!(l2.len(), 2);
    }

    #[test]
    fn test_tracing_sink_is_a_listener() {
        let bus = Bus::new();
        let sink = Arc::new(TracingSink::new(FamilyLevels::uniform(Level::PRIVATE)));
        bus.add_listener(&sink);
        dbg4!(bus, Signal::Enc, "nonce {}", vec![1_u8, 2, 3]);
        assert_eq!(bus.listener_count(), 1);
    }
}
