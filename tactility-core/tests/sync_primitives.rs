mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tactility_core::kernel::{self, MAX_TICKS};
use tactility_core::sync::{
    DataMutex, EventGroup, EventGroupError, Lock, MessageQueue, Mutex, RecursiveMutex, ScopedLock,
    Semaphore, StreamBuffer,
};

#[test]
fn mutex_serializes_critical_sections() {
    let mutex = Arc::new(Mutex::new());
    let inside = Arc::new(AtomicU32::new(0));
    let total = Arc::new(AtomicU32::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let mutex = Arc::clone(&mutex);
            let inside = Arc::clone(&inside);
            let total = Arc::clone(&total);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = mutex.lock_guard(MAX_TICKS).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    total.fetch_add(1, Ordering::SeqCst);
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(total.load(Ordering::SeqCst), 400);
}

#[test]
fn recursive_mutex_is_released_after_the_last_unlock() {
    let mutex = Arc::new(RecursiveMutex::new());
    for _ in 0..3 {
        assert!(mutex.lock(0));
    }

    let acquired = Arc::new(AtomicBool::new(false));
    let contender = {
        let mutex = Arc::clone(&mutex);
        let acquired = Arc::clone(&acquired);
        std::thread::spawn(move || {
            assert!(mutex.lock(MAX_TICKS));
            acquired.store(true, Ordering::SeqCst);
            mutex.unlock();
        })
    };

    mutex.unlock();
    mutex.unlock();
    std::thread::sleep(Duration::from_millis(20));
    assert!(!acquired.load(Ordering::SeqCst));

    mutex.unlock();
    contender.join().unwrap();
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn scoped_lock_releases_on_scope_exit() {
    let mutex = Mutex::new();
    {
        let scoped = ScopedLock::new(&mutex);
        assert!(scoped.lock(0));
        assert!(mutex.is_held_by_current());
    }
    assert!(!mutex.is_held_by_current());

    assert_eq!(mutex.with_lock(0, || 5), Some(5));
    assert!(!mutex.is_held_by_current());
}

#[test]
fn semaphore_counts_between_zero_and_max() {
    let semaphore = Semaphore::new(3, 1);
    assert_eq!(semaphore.max_count(), 3);
    assert!(semaphore.release());
    assert!(semaphore.release());
    assert!(!semaphore.release());
    assert_eq!(semaphore.available(), 3);

    for _ in 0..3 {
        assert!(semaphore.acquire(0));
    }
    assert!(!semaphore.acquire(5));
    assert_eq!(semaphore.available(), 0);
}

#[test]
fn semaphore_hands_off_from_interrupt_to_task() {
    let semaphore = Arc::new(Semaphore::new(1, 0));
    let waiter = {
        let semaphore = Arc::clone(&semaphore);
        std::thread::spawn(move || semaphore.acquire(MAX_TICKS))
    };
    std::thread::sleep(Duration::from_millis(10));
    assert!(kernel::simulate_isr(|| semaphore.release_from_isr()));
    assert!(waiter.join().unwrap());
}

#[test]
fn event_group_wait_any_and_all() {
    let events = Arc::new(EventGroup::new());
    events.set(0b0100);

    let any = {
        let events = Arc::clone(&events);
        std::thread::spawn(move || events.wait(0b0011, false, true, MAX_TICKS))
    };
    std::thread::sleep(Duration::from_millis(10));
    events.set(0b0010);
    assert_eq!(any.join().unwrap().map(|flags| flags & 0b0111), Ok(0b0110));
    assert_eq!(events.get(), 0b0100);

    let all = {
        let events = Arc::clone(&events);
        std::thread::spawn(move || events.wait(0b0011, true, false, MAX_TICKS))
    };
    events.set(0b0001);
    std::thread::sleep(Duration::from_millis(10));
    events.set(0b0010);
    assert_eq!(all.join().unwrap(), Ok(0b0111));
    assert_eq!(events.get(), 0b0111);

    assert_eq!(events.wait(0b1000, false, false, 5), Err(EventGroupError::Timeout));
    assert_eq!(events.wait(0b1000, false, false, 0), Err(EventGroupError::Resource));
    assert_eq!(events.wait(0, false, false, 0), Err(EventGroupError::Parameter));
}

#[test]
fn data_mutex_shares_state_between_tasks() {
    let data = Arc::new(DataMutex::new(Vec::new()));
    let writers: Vec<_> = (0..4)
        .map(|index| {
            let data = Arc::clone(&data);
            std::thread::spawn(move || data.lock_forever().push(index))
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    let mut values = data.lock_forever().clone();
    values.sort_unstable();
    assert_eq!(values, [0, 1, 2, 3]);
}

#[test]
fn message_queue_producers_and_consumer() {
    let queue = Arc::new(MessageQueue::new(4));
    let producers: Vec<_> = (0..4u32)
        .map(|id| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for seq in 0..25u32 {
                    assert!(queue.put(id * 100 + seq, MAX_TICKS).is_ok());
                }
            })
        })
        .collect();

    let mut last = [None::<u32>; 4];
    for _ in 0..100 {
        let value = queue.get(MAX_TICKS).unwrap();
        let (id, seq) = ((value / 100) as usize, value % 100);
        assert!(last[id].map_or(true, |previous| seq > previous));
        last[id] = Some(seq);
        assert!(queue.count() <= queue.capacity());
    }
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(queue.get(0), None);
}

#[test]
fn stream_buffer_blocked_writer_resumes_after_read() {
    let stream = Arc::new(StreamBuffer::new(4, 1));
    assert_eq!(stream.send(b"abcd", 0), 4);
    let writer = {
        let stream = Arc::clone(&stream);
        std::thread::spawn(move || stream.send(b"ef", MAX_TICKS))
    };
    std::thread::sleep(Duration::from_millis(10));
    assert!(!writer.is_finished());

    let mut head = [0u8; 2];
    assert_eq!(stream.receive(&mut head, 0), 2);
    assert_eq!(&head, b"ab");
    assert_eq!(writer.join().unwrap(), 2);

    let mut rest = [0u8; 8];
    assert_eq!(stream.receive(&mut rest, 0), 4);
    assert_eq!(&rest[..4], b"cdef");
}
