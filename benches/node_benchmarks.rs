use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use blockflow::buffer::BufferArena;
use blockflow::config::{AmplifierConfig, BridgeConfig};
use blockflow::graph::{GraphDefinition, NodeSpec, OutportRole};
use blockflow::node::{Component, Endpoint, NodeId, Outbox, ProcessContext};
use blockflow::nodes::{amplitude_ports, Amplitude, Forward};
use blockflow::{Bridge, BufferType, NullTransport, Packet};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Amplitude.process()", |b| {
        let mut node = Amplitude::new(0.5);
        let mut outbox = Outbox::with_capacity(4);

        b.iter_batched(
            || [0.25f32; 480],
            |mut data| {
                let mut arena = BufferArena::new(1);
                let buffer = arena.lend(&mut data, BufferType::Audio).unwrap();
                outbox.clear();
                let mut ctx = ProcessContext::new(NodeId(0), &mut arena, &mut outbox);
                node.process(&mut ctx, black_box(Packet::Buffer(buffer)), amplitude_ports::IN);
                data
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("Bridge.run() amplifier", |b| {
        let graph = GraphDefinition::amplifier(&AmplifierConfig::default());
        let mut bridge = Bridge::new(&graph, BridgeConfig::default(), Box::new(NullTransport::new())).unwrap();
        let input = [0.25f32; 480];
        let mut output = [0.0f32; 480];

        b.iter(|| bridge.run(black_box(&input), &mut output).unwrap())
    });

    c.bench_function("Bridge.run() forward chain x8", |b| {
        let mut graph = GraphDefinition::new();
        let mut prev = graph.add_node(NodeSpec::Forward);
        graph.set_inport(Endpoint { node: prev, port: Forward::IN });
        for _ in 0..7 {
            let next = graph.add_node(NodeSpec::Forward);
            graph.connect(
                Endpoint { node: prev, port: Forward::OUT },
                Endpoint { node: next, port: Forward::IN },
            );
            prev = next;
        }
        let amp = graph.add_node(NodeSpec::amplitude());
        graph
            .connect(
                Endpoint { node: prev, port: Forward::OUT },
                Endpoint { node: amp, port: amplitude_ports::IN },
            )
            .outport(Endpoint { node: amp, port: amplitude_ports::OUT }, OutportRole::Completion);

        let mut bridge = Bridge::new(&graph, BridgeConfig::default(), Box::new(NullTransport::new())).unwrap();
        let input = [0.25f32; 480];
        let mut output = [0.0f32; 480];

        b.iter(|| bridge.run(black_box(&input), &mut output).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
