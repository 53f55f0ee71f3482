use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use pretty_assertions::assert_eq;

use super::*;
use crate::{ActorId, Context, Envelope};

const WAIT: Duration = Duration::from_secs(10);

fn runtime() -> Runtime {
	Runtime::new(RuntimeConfig::default().thread_name("weft-test")).unwrap()
}

struct Inc;
struct Report(Sender<u64>);

#[derive(Default)]
struct Counter {
	count: u64,
	stopped: Option<Sender<u64>>,
}

impl Counter {
	fn reporting_stop(stopped: Sender<u64>) -> Self {
		Self {
			count: 0,
			stopped: Some(stopped),
		}
	}
}

impl Actor for Counter {
	fn started(&mut self, ctx: &mut Context<'_, Self>) {
		ctx.handler(|counter: &mut Counter, _ctx, _: Inc| counter.count += 1);
		ctx.handler(|counter: &mut Counter, _ctx, Report(reply): Report| {
			let _ = reply.send(counter.count);
		});
	}

	fn stopped(&mut self) {
		if let Some(stopped) = self.stopped.take() {
			let _ = stopped.send(self.count);
		}
	}
}

fn count_of(actor: &ActorRef) -> u64 {
	let (tx, rx) = bounded(1);
	assert!(actor.send(Report(tx)));
	rx.recv_timeout(WAIT).expect("counter did not report")
}

#[test]
fn eight_threads_of_increments_are_all_counted() {
	let rt = runtime();
	let (stopped_tx, stopped_rx) = unbounded();
	let counter = rt.spawn(Counter::reporting_stop(stopped_tx));

	let senders: Vec<_> = (0..8)
		.map(|_| {
			let counter = counter.clone();
			thread::spawn(move || {
				for _ in 0..1000 {
					assert!(counter.send(Inc));
				}
			})
		})
		.collect();
	for sender in senders {
		sender.join().unwrap();
	}

	assert_eq!(count_of(&counter), 8000);
	counter.destroy_and_wait();
	assert_eq!(stopped_rx.recv_timeout(WAIT).unwrap(), 8000);
	assert!(counter.is_terminated());
}

#[test]
fn send_after_destroy_is_rejected() {
	let rt = runtime();
	let (stopped_tx, stopped_rx) = unbounded();
	let counter = rt.spawn(Counter::reporting_stop(stopped_tx));
	counter.destroy();
	assert!(!counter.send(Inc));
	counter.join();
	assert_eq!(stopped_rx.recv_timeout(WAIT).unwrap(), 0);
}

#[test]
fn messages_from_one_sender_arrive_in_order() {
	struct Seq(usize, u32);
	struct Dump(Sender<Vec<Vec<u32>>>);
	struct Sink(Vec<Vec<u32>>);

	impl Actor for Sink {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|sink: &mut Sink, _ctx, Seq(sender, n): Seq| sink.0[sender].push(n));
			ctx.handler(|sink: &mut Sink, _ctx, Dump(reply): Dump| {
				let _ = reply.send(std::mem::take(&mut sink.0));
			});
		}
	}

	let rt = Runtime::new(RuntimeConfig::default().cores(2).time_slice(Duration::from_micros(50)).thread_name("weft-fifo")).unwrap();
	let sink = rt.spawn(Sink(vec![Vec::new(); 4]));
	thread::scope(|scope| {
		for sender in 0..4 {
			let sink = &sink;
			scope.spawn(move || {
				for n in 0..500 {
					sink.send(Seq(sender, n));
				}
			});
		}
	});

	let (tx, rx) = bounded(1);
	sink.send(Dump(tx));
	let received = rx.recv_timeout(WAIT).unwrap();
	for per_sender in received {
		assert_eq!(per_sender, (0..500).collect::<Vec<_>>());
	}
}

#[test]
fn handlers_of_one_actor_never_overlap() {
	struct Work;
	struct Guarded {
		busy: Arc<AtomicBool>,
		overlaps: Arc<AtomicUsize>,
		handled: u64,
	}

	impl Actor for Guarded {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|guarded: &mut Guarded, _ctx, _: Work| {
				if guarded.busy.swap(true, Ordering::SeqCst) {
					guarded.overlaps.fetch_add(1, Ordering::SeqCst);
				}
				let until = Instant::now() + Duration::from_micros(20);
				while Instant::now() < until {
					std::hint::spin_loop();
				}
				guarded.busy.store(false, Ordering::SeqCst);
				guarded.handled += 1;
			});
			ctx.handler(|guarded: &mut Guarded, _ctx, Report(reply): Report| {
				let _ = reply.send(guarded.handled);
			});
		}
	}

	for workers in 1..=4 {
		let config = RuntimeConfig::default().cores(1).workers_per_core(workers).max_workers(workers).time_slice(Duration::from_micros(200));
		let rt = Runtime::new(config.thread_name(format!("weft-serial-{workers}"))).unwrap();
		let overlaps = Arc::new(AtomicUsize::new(0));
		let actors: Vec<_> = (0..6)
			.map(|_| {
				rt.spawn(Guarded {
					busy: Arc::new(AtomicBool::new(false)),
					overlaps: Arc::clone(&overlaps),
					handled: 0,
				})
			})
			.collect();

		thread::scope(|scope| {
			for _ in 0..4 {
				let actors = &actors;
				scope.spawn(move || {
					for round in 0..100 {
						actors[round % actors.len()].send(Work);
						actors[(round * 7 + 3) % actors.len()].send(Work);
					}
				});
			}
		});

		let handled: u64 = actors
			.iter()
			.map(|actor| {
				let (tx, rx) = bounded(1);
				actor.send(Report(tx));
				rx.recv_timeout(WAIT).unwrap()
			})
			.sum();
		assert_eq!(handled, 800, "pool of {workers}");
		assert_eq!(overlaps.load(Ordering::SeqCst), 0, "pool of {workers}");
	}
}

#[test]
fn destroying_many_actors_from_many_threads_tears_each_down_once() {
	struct Tracked(Arc<AtomicUsize>);
	impl Actor for Tracked {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Tracked, _ctx, _: Inc| {});
		}

		fn stopped(&mut self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	let rt = runtime();
	let torn_down = Arc::new(AtomicUsize::new(0));
	let actors: Vec<_> = (0..1000).map(|_| rt.spawn(Tracked(Arc::clone(&torn_down)))).collect();
	for actor in actors.iter().step_by(3) {
		actor.send(Inc);
	}
	assert_eq!(rt.live_count(), 1000);

	thread::scope(|scope| {
		for chunk in actors.chunks(250) {
			scope.spawn(move || {
				for actor in chunk {
					actor.destroy_and_wait();
				}
			});
		}
	});

	assert_eq!(torn_down.load(Ordering::SeqCst), 1000);
	assert_eq!(rt.live_count(), 0);
	assert!(actors.iter().all(ActorRef::is_terminated));
}

#[test]
fn exclusive_actor_progresses_while_pool_is_saturated() {
	struct Block;
	struct Blocker {
		gate: Receiver<()>,
		entered: Sender<()>,
	}
	impl Actor for Blocker {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|blocker: &mut Blocker, _ctx, _: Block| {
				let _ = blocker.entered.send(());
				let _ = blocker.gate.recv();
			});
		}
	}

	struct Ping(Sender<thread::ThreadId>);
	struct Echo;
	impl Actor for Echo {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Echo, _ctx, Ping(reply): Ping| {
				let _ = reply.send(thread::current().id());
			});
		}
	}

	let config = RuntimeConfig::default().cores(1).workers_per_core(1).max_workers(2).thread_name("weft-saturated");
	let rt = Runtime::new(config).unwrap();
	let echo = rt.spawn_with(SpawnMode::Exclusive, Echo);

	let (gate_tx, gate_rx) = bounded::<()>(0);
	let (entered_tx, entered_rx) = unbounded();
	let blockers: Vec<_> = (0..3)
		.map(|_| {
			rt.spawn(Blocker {
				gate: gate_rx.clone(),
				entered: entered_tx.clone(),
			})
		})
		.collect();
	for blocker in &blockers {
		blocker.send(Block);
	}
	entered_rx.recv_timeout(WAIT).unwrap();

	let mut threads = Vec::new();
	for _ in 0..10 {
		let (tx, rx) = bounded(1);
		assert!(echo.send(Ping(tx)));
		threads.push(rx.recv_timeout(WAIT).expect("exclusive actor starved"));
	}
	assert!(threads.windows(2).all(|pair| pair[0] == pair[1]), "exclusive actor moved threads");
	assert_eq!(rt.pool_stats().workers, 1);
	assert_eq!(rt.pool_stats().exclusive, 1);

	drop(gate_tx);
	for _ in 1..blockers.len() {
		entered_rx.recv_timeout(WAIT).unwrap();
	}
}

#[test]
fn bound_actor_runs_only_on_its_thread() {
	struct Note;
	struct Homebound {
		home: thread::ThreadId,
		handled: Arc<AtomicUsize>,
		strays: Arc<AtomicUsize>,
	}
	impl Actor for Homebound {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|actor: &mut Homebound, _ctx, _: Note| {
				if thread::current().id() != actor.home {
					actor.strays.fetch_add(1, Ordering::SeqCst);
				}
				actor.handled.fetch_add(1, Ordering::SeqCst);
			});
		}
	}

	let rt = runtime();
	let handled = Arc::new(AtomicUsize::new(0));
	let strays = Arc::new(AtomicUsize::new(0));
	let (actor_tx, actor_rx) = bounded(1);

	let home = {
		let handle = rt.handle().clone();
		let handled = Arc::clone(&handled);
		let strays = Arc::clone(&strays);
		thread::spawn(move || {
			let _scope = this_thread::enter();
			let actor = handle.spawn_with(
				SpawnMode::Bind,
				Homebound {
					home: thread::current().id(),
					handled: Arc::clone(&handled),
					strays,
				},
			);
			actor_tx.send(actor).unwrap();
			let deadline = Instant::now() + WAIT;
			while handled.load(Ordering::SeqCst) < 300 && Instant::now() < deadline {
				this_thread::process_messages();
				thread::sleep(Duration::from_millis(1));
			}
		})
	};

	let actor = actor_rx.recv_timeout(WAIT).unwrap();
	thread::scope(|scope| {
		for _ in 0..3 {
			let actor = &actor;
			scope.spawn(move || {
				for _ in 0..100 {
					actor.send(Note);
				}
			});
		}
	});
	home.join().unwrap();

	assert_eq!(handled.load(Ordering::SeqCst), 300);
	assert_eq!(strays.load(Ordering::SeqCst), 0);
	assert!(actor.is_terminated(), "leaving the binding scope tears the actor down");
}

#[test]
fn last_reference_drop_tears_down_after_queued_messages() {
	let rt = runtime();
	let (stopped_tx, stopped_rx) = unbounded();
	let counter = rt.spawn(Counter::reporting_stop(stopped_tx));

	let workers: Vec<_> = (0..8)
		.map(|_| {
			let counter = counter.clone();
			thread::spawn(move || {
				for _ in 0..500 {
					let extra = counter.clone();
					extra.send(Inc);
				}
			})
		})
		.collect();
	drop(counter);
	for worker in workers {
		worker.join().unwrap();
	}

	// Queued envelopes keep the actor alive until each one is handled.
	assert_eq!(stopped_rx.recv_timeout(WAIT).unwrap(), 4000);
}

#[test]
fn shutdown_is_idempotent_and_rejects_later_work() {
	let rt = runtime();
	let (stopped_tx, stopped_rx) = unbounded();
	let actors: Vec<_> = (0..16).map(|_| rt.spawn(Counter::reporting_stop(stopped_tx.clone()))).collect();
	let exclusive = rt.spawn_with(SpawnMode::Exclusive, Counter::reporting_stop(stopped_tx.clone()));
	for actor in &actors {
		actor.send(Inc);
	}

	rt.shutdown();
	assert!(rt.is_terminating());
	assert_eq!(rt.live_count(), 0);
	assert!(actors.iter().all(ActorRef::is_terminated));
	assert!(exclusive.is_terminated());
	assert_eq!(stopped_rx.try_iter().count(), 17);
	assert_eq!(rt.pool_stats(), PoolStats::default());

	rt.shutdown();
	let late = rt.spawn(Counter::default());
	assert!(late.is_terminated());
	assert!(!late.send(Inc));
}

#[test]
fn concurrent_shutdown_calls_all_return() {
	let rt = runtime();
	let _actors: Vec<_> = (0..8).map(|_| rt.spawn(Counter::default())).collect();
	thread::scope(|scope| {
		for _ in 0..4 {
			scope.spawn(|| rt.shutdown());
		}
	});
	assert_eq!(rt.live_count(), 0);
}

#[test]
fn join_from_own_handler_returns_immediately() {
	struct JoinSelf(Sender<()>);
	struct Selfish;
	impl Actor for Selfish {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Selfish, ctx, JoinSelf(done): JoinSelf| {
				ctx.me().join();
				let _ = done.send(());
			});
		}
	}

	let rt = runtime();
	let actor = rt.spawn(Selfish);
	let (tx, rx) = bounded(1);
	actor.send(JoinSelf(tx));
	rx.recv_timeout(WAIT).unwrap();
	assert!(!actor.join_timeout(Duration::from_millis(10)));
}

#[test]
fn reply_reaches_the_sending_actor() {
	struct Ping;
	struct Pong;
	struct Start;

	struct Ponger;
	impl Actor for Ponger {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Ponger, ctx, _: Ping| {
				assert!(ctx.reply(Pong));
			});
		}
	}

	struct Pinger {
		target: ActorRef,
		got: Sender<(Option<ActorId>, ActorId)>,
	}
	impl Actor for Pinger {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|pinger: &mut Pinger, _ctx, _: Start| {
				pinger.target.send(Ping);
			});
			ctx.handler(|pinger: &mut Pinger, ctx, _: Pong| {
				let _ = pinger.got.send((ctx.sender().map(ActorRef::id), ctx.me().id()));
			});
		}
	}

	let rt = runtime();
	let ponger = rt.spawn(Ponger);
	let (got_tx, got_rx) = bounded(1);
	let pinger = rt.spawn(Pinger {
		target: ponger.clone(),
		got: got_tx,
	});
	assert!(pinger.send(Start));

	let (from, at) = got_rx.recv_timeout(WAIT).unwrap();
	assert_eq!(from, Some(ponger.id()));
	assert_eq!(at, pinger.id());
}

#[test]
fn send_on_behalf_records_the_given_sender() {
	struct Whoami(Sender<Option<ActorId>>);
	struct Mirror;
	impl Actor for Mirror {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Mirror, ctx, Whoami(reply): Whoami| {
				let _ = reply.send(ctx.sender().map(ActorRef::id));
			});
		}
	}

	let rt = runtime();
	let mirror = rt.spawn(Mirror);
	let proxy = rt.spawn(Counter::default());

	let (tx, rx) = bounded(1);
	mirror.send(Whoami(tx));
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), None, "plain threads send anonymously");

	let (tx, rx) = bounded(1);
	mirror.send_on_behalf(&proxy, Whoami(tx));
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(proxy.id()));
}

#[test]
fn die_tears_down_after_current_message() {
	struct Quit;
	struct Mortal;
	impl Actor for Mortal {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Mortal, ctx, _: Quit| ctx.die());
		}
	}

	let rt = runtime();
	let actor = rt.spawn(Mortal);
	assert!(actor.send(Quit));
	assert!(actor.join_timeout(WAIT));
	assert!(!actor.send(Quit));
	assert_eq!(rt.live_count(), 0);
}

#[test]
fn handler_panic_does_not_stop_the_actor() {
	struct Explode;
	struct Survivor(u64);
	impl Actor for Survivor {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Survivor, _ctx, _: Explode| panic!("handler exploded"));
			ctx.handler(|survivor: &mut Survivor, _ctx, _: Inc| survivor.0 += 1);
			ctx.handler(|survivor: &mut Survivor, _ctx, Report(reply): Report| {
				let _ = reply.send(survivor.0);
			});
		}
	}

	let rt = runtime();
	let actor = rt.spawn(Survivor(0));
	actor.send(Inc);
	actor.send(Explode);
	actor.send(Explode);
	actor.send(Inc);
	assert_eq!(count_of(&actor), 2);
	assert!(!actor.is_destroying());
}

#[test]
fn dying_in_started_returns_a_torn_down_handle() {
	struct Stillborn;
	impl Actor for Stillborn {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.die();
		}
	}

	let rt = runtime();
	let actor = rt.spawn(Stillborn);
	assert!(actor.is_terminated());
	assert!(!actor.send(()));
	assert_eq!(rt.live_count(), 0);
}

#[test]
fn handlers_can_spawn_actors() {
	struct SpawnChild(Sender<Option<ActorRef>>);
	struct Parent;
	impl Actor for Parent {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Parent, ctx, SpawnChild(reply): SpawnChild| {
				let _ = reply.send(ctx.spawn(Counter::default()));
			});
		}
	}

	let rt = runtime();
	let parent = rt.spawn(Parent);
	let (tx, rx) = bounded(1);
	parent.send(SpawnChild(tx));
	let child = rx.recv_timeout(WAIT).unwrap().expect("runtime is alive");
	child.send(Inc);
	assert_eq!(count_of(&child), 1);
	assert_eq!(rt.live_count(), 2);
}

#[test]
fn actors_lists_live_actors_by_id() {
	let rt = runtime();
	let shared = rt.spawn(Counter::default());
	let exclusive = rt.spawn_with(SpawnMode::Exclusive, Counter::default());

	let records = rt.actors();
	let listed: Vec<_> = records.iter().map(|record| (record.id, record.mode)).collect();
	assert_eq!(listed, vec![(shared.id(), SpawnMode::Shared), (exclusive.id(), SpawnMode::Exclusive)]);
	assert!(shared.id() < exclusive.id());

	shared.destroy_and_wait();
	assert_eq!(rt.actors().len(), 1);
	assert_eq!(rt.live_count(), 1);
}

#[test]
fn raw_bodies_share_the_actor_lifecycle() {
	let rt = runtime();
	let (seen_tx, seen_rx) = unbounded();
	let proxy = rt.spawn_body(
		SpawnMode::Shared,
		Box::new(move |envelope: Envelope| {
			let _ = seen_tx.send(envelope.type_name());
			if envelope.is::<Inc>() { Flow::Stop } else { Flow::Continue }
		}),
	);
	proxy.send(7u8);
	proxy.send(Inc);
	assert!(proxy.join_timeout(WAIT));
	let seen: Vec<_> = seen_rx.try_iter().collect();
	assert_eq!(seen, vec![std::any::type_name::<u8>(), std::any::type_name::<Inc>()]);
}

#[test]
fn idle_workers_are_reaped_down_to_the_floor() {
	struct Nap;
	struct Sleeper;
	impl Actor for Sleeper {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Sleeper, _ctx, _: Nap| thread::sleep(Duration::from_millis(20)));
		}
	}

	let config = RuntimeConfig::default()
		.cores(1)
		.workers_per_core(4)
		.idle_timeout(Duration::from_millis(50))
		.min_idle_workers(1)
		.scheduler_tick(Duration::from_millis(1), Duration::from_millis(10))
		.thread_name("weft-reap");
	let rt = Runtime::new(config).unwrap();
	let sleepers: Vec<_> = (0..4).map(|_| rt.spawn(Sleeper)).collect();
	for sleeper in &sleepers {
		sleeper.send(Nap);
	}

	let deadline = Instant::now() + WAIT;
	while rt.pool_stats().workers < 2 && Instant::now() < deadline {
		thread::sleep(Duration::from_millis(1));
	}
	assert!(rt.pool_stats().workers >= 2);

	while rt.pool_stats().workers > 1 && Instant::now() < deadline {
		thread::sleep(Duration::from_millis(5));
	}
	assert_eq!(rt.pool_stats().workers, 1);
}

#[test]
fn messages_sent_to_self_from_started_are_handled() {
	struct Greet;
	struct Eager(Sender<SpawnMode>);
	impl Actor for Eager {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|eager: &mut Eager, ctx, _: Greet| {
				let _ = eager.0.send(ctx.me().mode());
			});
			assert!(ctx.me().send(Greet));
		}
	}

	let rt = runtime();
	for mode in [SpawnMode::Shared, SpawnMode::Exclusive] {
		let (tx, rx) = bounded(1);
		let actor = rt.spawn_with(mode, Eager(tx));
		assert_eq!(rx.recv_timeout(WAIT).ok(), Some(mode));
		actor.destroy_and_wait();
	}
	assert_eq!(rt.live_count(), 0);
}

#[test]
fn destroy_from_started_finishes_teardown() {
	struct Regretful(Sender<()>);
	impl Actor for Regretful {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.me().destroy();
		}

		fn stopped(&mut self) {
			let _ = self.0.send(());
		}
	}

	let rt = runtime();
	for mode in [SpawnMode::Shared, SpawnMode::Exclusive] {
		let (tx, rx) = unbounded();
		let actor = rt.spawn_with(mode, Regretful(tx));
		assert!(actor.join_timeout(WAIT), "{mode:?} actor stuck after destroy in started");
		assert!(!actor.send(Inc));
		assert_eq!(rx.try_iter().count(), 1);
	}
	assert_eq!(rt.live_count(), 0);
}

struct XorShift(u64);

impl XorShift {
	fn next(&mut self) -> u64 {
		let mut x = self.0;
		x ^= x << 13;
		x ^= x >> 7;
		x ^= x << 17;
		self.0 = x;
		x
	}

	fn index(&mut self, len: usize) -> usize {
		(self.next() % len as u64) as usize
	}
}

#[test]
fn churning_handles_across_threads_tears_every_actor_down_once() {
	struct Carry(ActorRef);
	struct Relay(Arc<AtomicUsize>);
	impl Actor for Relay {
		fn started(&mut self, ctx: &mut Context<'_, Self>) {
			ctx.handler(|_: &mut Relay, _ctx, _: Inc| {});
			ctx.handler(|_: &mut Relay, _ctx, Carry(next): Carry| {
				next.send(Inc);
			});
		}

		fn stopped(&mut self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	let rt = Runtime::new(RuntimeConfig::default().cores(2).thread_name("weft-churn")).unwrap();
	let spawned = AtomicUsize::new(0);
	let torn_down = Arc::new(AtomicUsize::new(0));
	let (handoff_tx, handoff_rx) = unbounded::<ActorRef>();

	thread::scope(|scope| {
		for seed in 1..=8u64 {
			let (rt, spawned, torn_down) = (&rt, &spawned, &torn_down);
			let (handoff_tx, handoff_rx) = (handoff_tx.clone(), handoff_rx.clone());
			scope.spawn(move || {
				let mut rng = XorShift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
				let mut held: Vec<ActorRef> = Vec::new();
				for _ in 0..2000 {
					match rng.next() % 8 {
						0 | 1 => {
							held.push(rt.spawn(Relay(Arc::clone(torn_down))));
							spawned.fetch_add(1, Ordering::SeqCst);
						}
						2 if !held.is_empty() => {
							held[rng.index(held.len())].send(Inc);
						}
						3 if !held.is_empty() => {
							let carrier = rng.index(held.len());
							let carried = held[rng.index(held.len())].clone();
							held[carrier].send(Carry(carried));
						}
						4 if !held.is_empty() => {
							let _ = handoff_tx.send(held[rng.index(held.len())].clone());
						}
						5 => held.extend(handoff_rx.try_recv()),
						6 if !held.is_empty() => {
							held.swap_remove(rng.index(held.len()));
						}
						7 if !held.is_empty() && rng.next() % 4 == 0 => {
							held[rng.index(held.len())].destroy();
						}
						_ => {}
					}
				}
			});
		}
	});
	// Handles still parked in the channel are released with it.
	drop((handoff_tx, handoff_rx));

	let total = spawned.load(Ordering::SeqCst);
	let deadline = Instant::now() + WAIT;
	while (torn_down.load(Ordering::SeqCst) < total || rt.live_count() > 0) && Instant::now() < deadline {
		thread::sleep(Duration::from_millis(1));
	}
	assert_eq!(torn_down.load(Ordering::SeqCst), total);
	assert_eq!(rt.live_count(), 0);
}
