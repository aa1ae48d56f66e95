//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需真实设备）
//! - 同步语义的端到端验证

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchConfig, PayloadKind, StreamName};

    #[test]
    fn contracts_defaults_are_stable() {
        let config = DispatchConfig::default();
        assert_eq!(config.queue.capacity, 10);
        assert_eq!(config.sync.eviction_horizon, 30);

        let name: StreamName = "color".into();
        assert_eq!(name, "color");
        assert_eq!(PayloadKind::Detections.as_str(), "detections");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use contracts::{
        Bundle, DeviceSource, DispatchConfig, Packet, PayloadKind, QueueConfig, SinkFlow,
        StreamDescriptor, StreamError, SyncConfig,
    };
    use dispatcher::{BindRequest, DiskWriter, DispatchEngine};
    use ingestion::{MockDevice, MockStreamConfig};

    fn drive_until<F: Fn() -> bool>(engine: &mut DispatchEngine, done: F) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done() {
            assert!(Instant::now() < deadline, "pipeline did not make progress");
            if !engine.dispatch_once() {
                break;
            }
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    fn descriptors(names: &[&str]) -> Vec<StreamDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| StreamDescriptor::named(id as u32, *name))
            .collect()
    }

    fn packet(stream: &str, sequence: u64) -> Packet {
        Packet::new(
            stream,
            sequence,
            PayloadKind::Frame,
            Bytes::from_static(b"frame"),
            sequence as f64 * 0.033,
        )
    }

    /// End-to-end: MockDevice -> queues -> synchronizer -> callback sink.
    #[test]
    fn mock_device_to_callback_pipeline() {
        let mut device = MockDevice::new(vec![
            MockStreamConfig::camera("color", 500.0),
            MockStreamConfig::detections("nn", 500.0),
        ]);
        let mut engine = DispatchEngine::new(DispatchConfig::default());

        let bundles = Arc::new(AtomicU64::new(0));
        let bundles_in_cb = Arc::clone(&bundles);
        engine
            .bind(BindRequest::callback(
                descriptors(&["color", "nn"]),
                Box::new(move |bundle: &Bundle| {
                    assert_eq!(bundle.len(), 2);
                    bundles_in_cb.fetch_add(1, Ordering::Relaxed);
                    Ok(SinkFlow::Continue)
                }),
            ))
            .unwrap();

        for source in device.streams() {
            let mut sender = engine.sender(&source.name).unwrap();
            device
                .attach(
                    &source.name,
                    Box::new(move |p| {
                        sender.push(p);
                    }),
                )
                .unwrap();
        }

        device.start().unwrap();
        drive_until(&mut engine, || bundles.load(Ordering::Relaxed) >= 5);
        device.stop();
        engine.stop();

        assert!(bundles.load(Ordering::Relaxed) >= 5);
        let stats = engine.binding_stats();
        assert_eq!(stats.len(), 1);
        assert!(stats[0].sync.is_some());
    }

    /// A lossy detection stream never stalls the join: groups missing the
    /// dropped sequences are evicted, everything else comes out in strictly
    /// ascending order.
    #[test]
    fn lossy_stream_yields_ascending_complete_bundles() {
        let mut device = MockDevice::new(vec![
            MockStreamConfig::camera("color", 2000.0).with_max_packets(30),
            MockStreamConfig::detections("nn", 2000.0)
                .with_drop_every(3)
                .with_max_packets(30),
        ]);
        let config = DispatchConfig {
            queue: QueueConfig { capacity: 64 },
            sync: SyncConfig {
                eviction_horizon: 2,
            },
            ..Default::default()
        };
        let mut engine = DispatchEngine::new(config);

        let emitted = Arc::new(Mutex::new(Vec::new()));
        let emitted_in_cb = Arc::clone(&emitted);
        engine
            .bind(BindRequest::callback(
                descriptors(&["color", "nn"]),
                Box::new(move |bundle: &Bundle| {
                    emitted_in_cb.lock().unwrap().push(bundle.sequence);
                    Ok(SinkFlow::Continue)
                }),
            ))
            .unwrap();

        for source in device.streams() {
            let mut sender = engine.sender(&source.name).unwrap();
            device
                .attach(
                    &source.name,
                    Box::new(move |p| {
                        sender.push(p);
                    }),
                )
                .unwrap();
        }

        device.start().unwrap();
        // nn drops sequences 0, 3, 6, ... out of 0..30, leaving 20 joinable.
        drive_until(&mut engine, || emitted.lock().unwrap().len() >= 18);
        device.stop();
        engine.stop();

        let emitted = emitted.lock().unwrap();
        assert!(emitted.windows(2).all(|w| w[0] < w[1]), "must be ascending");
        assert!(emitted.iter().all(|seq| seq % 3 != 0), "dropped groups leak");
    }

    /// Color delivers sequences 0,1,2 while the detection stream delivers
    /// only 1,2: with a horizon of 1 the stalled group 0 is evicted and the
    /// callback sees exactly bundles 1 and 2, in order, never 0.
    #[test]
    fn partial_overlap_emits_only_complete_groups_in_order() {
        let config = DispatchConfig {
            sync: SyncConfig {
                eviction_horizon: 1,
            },
            ..Default::default()
        };
        let mut engine = DispatchEngine::new(config);

        let emitted = Arc::new(Mutex::new(Vec::new()));
        let emitted_in_cb = Arc::clone(&emitted);
        engine
            .bind(BindRequest::callback(
                descriptors(&["color", "nn"]),
                Box::new(move |bundle: &Bundle| {
                    emitted_in_cb.lock().unwrap().push(bundle.sequence);
                    Ok(SinkFlow::Continue)
                }),
            ))
            .unwrap();

        let mut color = engine.sender("color").unwrap();
        let mut nn = engine.sender("nn").unwrap();
        for seq in 0..3 {
            color.push(packet("color", seq));
        }
        for seq in 1..3 {
            nn.push(packet("nn", seq));
        }

        for _ in 0..6 {
            engine.dispatch_once();
        }
        engine.stop();

        assert_eq!(*emitted.lock().unwrap(), vec![1, 2]);
        let stats = engine.binding_stats();
        let sync = stats[0].sync.unwrap();
        assert_eq!(sync.evicted, 1);
        assert_eq!(sync.emitted, 2);
    }

    /// One failing sink must not starve a healthy one fed by the same stream.
    #[test]
    fn failing_sink_is_isolated_end_to_end() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let healthy = Arc::new(AtomicU64::new(0));
        let healthy_in_cb = Arc::clone(&healthy);

        engine
            .bind(
                BindRequest::callback(
                    descriptors(&["color"]),
                    Box::new(|_b: &Bundle| Err(StreamError::sink_deliver("bad", "io down"))),
                )
                .named("bad"),
            )
            .unwrap();
        engine
            .bind(
                BindRequest::callback(
                    descriptors(&["color"]),
                    Box::new(move |_b: &Bundle| {
                        healthy_in_cb.fetch_add(1, Ordering::Relaxed);
                        Ok(SinkFlow::Continue)
                    }),
                )
                .named("good"),
            )
            .unwrap();

        let mut sender = engine.sender("color").unwrap();
        for seq in 0..8 {
            sender.push(packet("color", seq));
            assert!(engine.dispatch_once());
        }
        engine.stop();

        assert_eq!(healthy.load(Ordering::Relaxed), 8);
        let stats = engine.binding_stats();
        let bad = stats.iter().find(|s| s.name == "bad").unwrap();
        assert_eq!(bad.sink_failures, 8);
    }

    /// Record binding persists every emitted bundle and survives teardown.
    #[test]
    fn record_binding_writes_session_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DiskWriter::create(dir.path()).unwrap();
        let session = writer.session_dir().to_path_buf();

        let mut engine = DispatchEngine::new(DispatchConfig::default());
        engine
            .bind(BindRequest::record(
                descriptors(&["color"]),
                Box::new(writer),
                session.clone(),
            ))
            .unwrap();

        let mut sender = engine.sender("color").unwrap();
        for seq in 0..3 {
            sender.push(packet("color", seq));
            assert!(engine.dispatch_once());
        }
        engine.stop();

        for seq in 0..3 {
            assert!(session.join(format!("color/{seq}.bin")).exists());
            assert!(session.join(format!("meta/{seq}.json")).exists());
        }
    }
}
