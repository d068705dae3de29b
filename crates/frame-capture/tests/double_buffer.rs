use frame_capture::DoubleBuffer;

#[test]
fn allocates_two_when_double_buffered() {
    let mut buffers = DoubleBuffer::new();

    buffers
        .reallocate(true, || Ok::<_, ()>(0u32))
        .unwrap();
    assert_eq!(buffers.len(), 2);

    buffers
        .reallocate(false, || Ok::<_, ()>(0u32))
        .unwrap();
    assert_eq!(buffers.len(), 1);
}

#[test]
fn parity_follows_acquire_count() {
    let mut buffers = DoubleBuffer::new();
    let mut next = 0;
    buffers
        .reallocate(true, || {
            next += 1;
            Ok::<_, ()>(next)
        })
        .unwrap();

    for k in 1..=9 {
        let (write, read) = buffers.acquire().unwrap();
        let (write, read) = (*write, *read);

        assert_ne!(write, read);
        assert_eq!(buffers.parity(), k % 2);
    }

    // Reallocation resets the parity.
    buffers
        .reallocate(true, || Ok::<_, ()>(0))
        .unwrap();
    assert_eq!(buffers.parity(), 0);
}

#[test]
fn written_buffer_is_read_next_frame() {
    let mut buffers = DoubleBuffer::new();
    let mut next = 0;
    buffers
        .reallocate(true, || {
            next += 1;
            Ok::<_, ()>(next)
        })
        .unwrap();

    let (first_write, _) = buffers.acquire().map(|(w, r)| (*w, *r)).unwrap();
    let (_, second_read) = buffers.acquire().map(|(w, r)| (*w, *r)).unwrap();

    assert_eq!(first_write, second_read);
}

#[test]
fn single_buffer_writes_and_reads_the_same() {
    let mut buffers = DoubleBuffer::new();
    buffers
        .reallocate(false, || Ok::<_, ()>(7u32))
        .unwrap();

    for _ in 0..3 {
        let (write, read) = buffers.acquire().unwrap();
        assert!(core::ptr::eq(write, read));
    }
}

#[test]
fn failed_creation_leaves_manager_empty() {
    let mut buffers = DoubleBuffer::new();
    buffers
        .reallocate(true, || Ok::<_, &str>(1u32))
        .unwrap();

    let mut created = 0;
    let result = buffers.reallocate(true, || {
        created += 1;
        if created == 2 { Err("out of memory") } else { Ok(2u32) }
    });

    assert_eq!(result, Err("out of memory"));
    assert!(buffers.is_empty());
    assert!(buffers.acquire().is_none());
}

#[test]
fn empty_manager_has_no_targets() {
    let mut buffers = DoubleBuffer::<u32>::new();
    assert!(buffers.acquire().is_none());
    assert!(buffers.first().is_none());
}
