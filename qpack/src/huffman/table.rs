// Copyright (C) 2025, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! RFC 7541 Appendix B Huffman code tables.

/// Code length and code for every octet, plus EOS at index 256.
#[rustfmt::skip]
pub const ENCODE_TABLE: [(usize, u64); 257] = [
    (13, 0x1ff8), (23, 0x7fffd8), (28, 0xfffffe2), (28, 0xfffffe3),
    (28, 0xfffffe4), (28, 0xfffffe5), (28, 0xfffffe6), (28, 0xfffffe7),
    (28, 0xfffffe8), (24, 0xffffea), (30, 0x3ffffffc), (28, 0xfffffe9),
    (28, 0xfffffea), (30, 0x3ffffffd), (28, 0xfffffeb), (28, 0xfffffec),
    (28, 0xfffffed), (28, 0xfffffee), (28, 0xfffffef), (28, 0xffffff0),
    (28, 0xffffff1), (28, 0xffffff2), (30, 0x3ffffffe), (28, 0xffffff3),
    (28, 0xffffff4), (28, 0xffffff5), (28, 0xffffff6), (28, 0xffffff7),
    (28, 0xffffff8), (28, 0xffffff9), (28, 0xffffffa), (28, 0xffffffb),
    (6, 0x14), (10, 0x3f8), (10, 0x3f9), (12, 0xffa),
    (13, 0x1ff9), (6, 0x15), (8, 0xf8), (11, 0x7fa),
    (10, 0x3fa), (10, 0x3fb), (8, 0xf9), (11, 0x7fb),
    (8, 0xfa), (6, 0x16), (6, 0x17), (6, 0x18),
    (5, 0x0), (5, 0x1), (5, 0x2), (6, 0x19),
    (6, 0x1a), (6, 0x1b), (6, 0x1c), (6, 0x1d),
    (6, 0x1e), (6, 0x1f), (7, 0x5c), (8, 0xfb),
    (15, 0x7ffc), (6, 0x20), (12, 0xffb), (10, 0x3fc),
    (13, 0x1ffa), (6, 0x21), (7, 0x5d), (7, 0x5e),
    (7, 0x5f), (7, 0x60), (7, 0x61), (7, 0x62),
    (7, 0x63), (7, 0x64), (7, 0x65), (7, 0x66),
    (7, 0x67), (7, 0x68), (7, 0x69), (7, 0x6a),
    (7, 0x6b), (7, 0x6c), (7, 0x6d), (7, 0x6e),
    (7, 0x6f), (7, 0x70), (7, 0x71), (7, 0x72),
    (8, 0xfc), (7, 0x73), (8, 0xfd), (13, 0x1ffb),
    (19, 0x7fff0), (13, 0x1ffc), (14, 0x3ffc), (6, 0x22),
    (15, 0x7ffd), (5, 0x3), (6, 0x23), (5, 0x4),
    (6, 0x24), (5, 0x5), (6, 0x25), (6, 0x26),
    (6, 0x27), (5, 0x6), (7, 0x74), (7, 0x75),
    (6, 0x28), (6, 0x29), (6, 0x2a), (5, 0x7),
    (6, 0x2b), (7, 0x76), (6, 0x2c), (5, 0x8),
    (5, 0x9), (6, 0x2d), (7, 0x77), (7, 0x78),
    (7, 0x79), (7, 0x7a), (7, 0x7b), (15, 0x7ffe),
    (11, 0x7fc), (14, 0x3ffd), (13, 0x1ffd), (28, 0xffffffc),
    (20, 0xfffe6), (22, 0x3fffd2), (20, 0xfffe7), (20, 0xfffe8),
    (22, 0x3fffd3), (22, 0x3fffd4), (22, 0x3fffd5), (23, 0x7fffd9),
    (22, 0x3fffd6), (23, 0x7fffda), (23, 0x7fffdb), (23, 0x7fffdc),
    (23, 0x7fffdd), (23, 0x7fffde), (24, 0xffffeb), (23, 0x7fffdf),
    (24, 0xffffec), (24, 0xffffed), (22, 0x3fffd7), (23, 0x7fffe0),
    (24, 0xffffee), (23, 0x7fffe1), (23, 0x7fffe2), (23, 0x7fffe3),
    (23, 0x7fffe4), (21, 0x1fffdc), (22, 0x3fffd8), (23, 0x7fffe5),
    (22, 0x3fffd9), (23, 0x7fffe6), (23, 0x7fffe7), (24, 0xffffef),
    (22, 0x3fffda), (21, 0x1fffdd), (20, 0xfffe9), (22, 0x3fffdb),
    (22, 0x3fffdc), (23, 0x7fffe8), (23, 0x7fffe9), (21, 0x1fffde),
    (23, 0x7fffea), (22, 0x3fffdd), (22, 0x3fffde), (24, 0xfffff0),
    (21, 0x1fffdf), (22, 0x3fffdf), (23, 0x7fffeb), (23, 0x7fffec),
    (21, 0x1fffe0), (21, 0x1fffe1), (22, 0x3fffe0), (21, 0x1fffe2),
    (23, 0x7fffed), (22, 0x3fffe1), (23, 0x7fffee), (23, 0x7fffef),
    (20, 0xfffea), (22, 0x3fffe2), (22, 0x3fffe3), (22, 0x3fffe4),
    (23, 0x7ffff0), (22, 0x3fffe5), (22, 0x3fffe6), (23, 0x7ffff1),
    (26, 0x3ffffe0), (26, 0x3ffffe1), (20, 0xfffeb), (19, 0x7fff1),
    (22, 0x3fffe7), (23, 0x7ffff2), (22, 0x3fffe8), (25, 0x1ffffec),
    (26, 0x3ffffe2), (26, 0x3ffffe3), (26, 0x3ffffe4), (27, 0x7ffffde),
    (27, 0x7ffffdf), (26, 0x3ffffe5), (24, 0xfffff1), (25, 0x1ffffed),
    (19, 0x7fff2), (21, 0x1fffe3), (26, 0x3ffffe6), (27, 0x7ffffe0),
    (27, 0x7ffffe1), (26, 0x3ffffe7), (27, 0x7ffffe2), (24, 0xfffff2),
    (21, 0x1fffe4), (21, 0x1fffe5), (26, 0x3ffffe8), (26, 0x3ffffe9),
    (28, 0xffffffd), (27, 0x7ffffe3), (27, 0x7ffffe4), (27, 0x7ffffe5),
    (20, 0xfffec), (24, 0xfffff3), (20, 0xfffed), (21, 0x1fffe6),
    (22, 0x3fffe9), (21, 0x1fffe7), (21, 0x1fffe8), (23, 0x7ffff3),
    (22, 0x3fffea), (22, 0x3fffeb), (25, 0x1ffffee), (25, 0x1ffffef),
    (24, 0xfffff4), (24, 0xfffff5), (26, 0x3ffffea), (23, 0x7ffff4),
    (26, 0x3ffffeb), (27, 0x7ffffe6), (26, 0x3ffffec), (26, 0x3ffffed),
    (27, 0x7ffffe7), (27, 0x7ffffe8), (27, 0x7ffffe9), (27, 0x7ffffea),
    (27, 0x7ffffeb), (28, 0xffffffe), (27, 0x7ffffec), (27, 0x7ffffed),
    (27, 0x7ffffee), (27, 0x7ffffef), (27, 0x7fffff0), (26, 0x3ffffee),
    (30, 0x3fffffff),
];

/// Decoder state machine consuming 4 bits at a time, indexed by state
/// then by nibble. Each transition is (next-state, byte, flags).
#[rustfmt::skip]
pub const DECODE_TABLE: [[(usize, u8, u8); 16]; 256] = [
    // 0
    [
        (87, 0, 0), (88, 0, 0), (131, 0, 0), (135, 0, 0),
        (143, 0, 0), (69, 0, 0), (83, 0, 0), (90, 0, 0),
        (100, 0, 0), (132, 0, 0), (138, 0, 0), (95, 0, 0),
        (105, 0, 0), (112, 0, 0), (119, 0, 0), (4, 0, 1),
    ],
    // 1
    [
        (101, 0, 0), (129, 0, 0), (133, 0, 0), (134, 0, 0),
        (139, 0, 0), (140, 0, 0), (142, 0, 0), (96, 0, 0),
        (106, 0, 0), (109, 0, 0), (113, 0, 0), (116, 0, 0),
        (120, 0, 0), (136, 0, 0), (144, 0, 0), (5, 0, 1),
    ],
    // 2
    [
        (107, 0, 0), (108, 0, 0), (110, 0, 0), (111, 0, 0),
        (114, 0, 0), (115, 0, 0), (117, 0, 0), (118, 0, 0),
        (121, 0, 0), (122, 0, 0), (137, 0, 0), (141, 0, 0),
        (145, 0, 0), (146, 0, 0), (75, 0, 0), (6, 0, 1),
    ],
    // 3
    [
        (0, 85, 3), (0, 86, 3), (0, 87, 3), (0, 89, 3),
        (0, 106, 3), (0, 107, 3), (0, 113, 3), (0, 118, 3),
        (0, 119, 3), (0, 120, 3), (0, 121, 3), (0, 122, 3),
        (76, 0, 0), (80, 0, 0), (123, 0, 0), (7, 0, 1),
    ],
    // 4
    [
        (66, 119, 2), (1, 119, 3), (66, 120, 2), (1, 120, 3),
        (66, 121, 2), (1, 121, 3), (66, 122, 2), (1, 122, 3),
        (0, 38, 3), (0, 42, 3), (0, 44, 3), (0, 59, 3),
        (0, 88, 3), (0, 90, 3), (71, 0, 0), (8, 0, 0),
    ],
    // 5
    [
        (66, 38, 2), (1, 38, 3), (66, 42, 2), (1, 42, 3),
        (66, 44, 2), (1, 44, 3), (66, 59, 2), (1, 59, 3),
        (66, 88, 2), (1, 88, 3), (66, 90, 2), (1, 90, 3),
        (72, 0, 0), (79, 0, 0), (77, 0, 0), (9, 0, 0),
    ],
    // 6
    [
        (85, 88, 2), (67, 88, 2), (93, 88, 2), (2, 88, 3),
        (85, 90, 2), (67, 90, 2), (93, 90, 2), (2, 90, 3),
        (0, 33, 3), (0, 34, 3), (0, 40, 3), (0, 41, 3),
        (0, 63, 3), (78, 0, 0), (73, 0, 0), (10, 0, 0),
    ],
    // 7
    [
        (66, 33, 2), (1, 33, 3), (66, 34, 2), (1, 34, 3),
        (66, 40, 2), (1, 40, 3), (66, 41, 2), (1, 41, 3),
        (66, 63, 2), (1, 63, 3), (0, 39, 3), (0, 43, 3),
        (0, 124, 3), (74, 0, 0), (11, 0, 0), (13, 0, 0),
    ],
    // 8
    [
        (85, 63, 2), (67, 63, 2), (93, 63, 2), (2, 63, 3),
        (66, 39, 2), (1, 39, 3), (66, 43, 2), (1, 43, 3),
        (66, 124, 2), (1, 124, 3), (0, 35, 3), (0, 62, 3),
        (12, 0, 0), (102, 0, 0), (127, 0, 0), (14, 0, 0),
    ],
    // 9
    [
        (85, 124, 2), (67, 124, 2), (93, 124, 2), (2, 124, 3),
        (66, 35, 2), (1, 35, 3), (66, 62, 2), (1, 62, 3),
        (0, 0, 3), (0, 36, 3), (0, 64, 3), (0, 91, 3),
        (0, 93, 3), (0, 126, 3), (128, 0, 0), (15, 0, 0),
    ],
    // 10
    [
        (66, 0, 2), (1, 0, 3), (66, 36, 2), (1, 36, 3),
        (66, 64, 2), (1, 64, 3), (66, 91, 2), (1, 91, 3),
        (66, 93, 2), (1, 93, 3), (66, 126, 2), (1, 126, 3),
        (0, 94, 3), (0, 125, 3), (98, 0, 0), (16, 0, 0),
    ],
    // 11
    [
        (85, 0, 2), (67, 0, 2), (93, 0, 2), (2, 0, 3),
        (85, 36, 2), (67, 36, 2), (93, 36, 2), (2, 36, 3),
        (85, 64, 2), (67, 64, 2), (93, 64, 2), (2, 64, 3),
        (85, 91, 2), (67, 91, 2), (93, 91, 2), (2, 91, 3),
    ],
    // 12
    [
        (86, 0, 2), (130, 0, 2), (68, 0, 2), (82, 0, 2),
        (99, 0, 2), (94, 0, 2), (104, 0, 2), (3, 0, 3),
        (86, 36, 2), (130, 36, 2), (68, 36, 2), (82, 36, 2),
        (99, 36, 2), (94, 36, 2), (104, 36, 2), (3, 36, 3),
    ],
    // 13
    [
        (85, 93, 2), (67, 93, 2), (93, 93, 2), (2, 93, 3),
        (85, 126, 2), (67, 126, 2), (93, 126, 2), (2, 126, 3),
        (66, 94, 2), (1, 94, 3), (66, 125, 2), (1, 125, 3),
        (0, 60, 3), (0, 96, 3), (0, 123, 3), (17, 0, 0),
    ],
    // 14
    [
        (85, 94, 2), (67, 94, 2), (93, 94, 2), (2, 94, 3),
        (85, 125, 2), (67, 125, 2), (93, 125, 2), (2, 125, 3),
        (66, 60, 2), (1, 60, 3), (66, 96, 2), (1, 96, 3),
        (66, 123, 2), (1, 123, 3), (124, 0, 0), (18, 0, 0),
    ],
    // 15
    [
        (85, 60, 2), (67, 60, 2), (93, 60, 2), (2, 60, 3),
        (85, 96, 2), (67, 96, 2), (93, 96, 2), (2, 96, 3),
        (85, 123, 2), (67, 123, 2), (93, 123, 2), (2, 123, 3),
        (125, 0, 0), (155, 0, 0), (150, 0, 0), (19, 0, 0),
    ],
    // 16
    [
        (86, 123, 2), (130, 123, 2), (68, 123, 2), (82, 123, 2),
        (99, 123, 2), (94, 123, 2), (104, 123, 2), (3, 123, 3),
        (126, 0, 0), (148, 0, 0), (156, 0, 0), (175, 0, 0),
        (196, 0, 0), (151, 0, 0), (20, 0, 0), (25, 0, 0),
    ],
    // 17
    [
        (0, 92, 3), (0, 195, 3), (0, 208, 3), (149, 0, 0),
        (157, 0, 0), (204, 0, 0), (241, 0, 0), (176, 0, 0),
        (197, 0, 0), (235, 0, 0), (152, 0, 0), (178, 0, 0),
        (199, 0, 0), (21, 0, 0), (167, 0, 0), (26, 0, 0),
    ],
    // 18
    [
        (198, 0, 0), (202, 0, 0), (236, 0, 0), (242, 0, 0),
        (153, 0, 0), (158, 0, 0), (179, 0, 0), (183, 0, 0),
        (200, 0, 0), (206, 0, 0), (216, 0, 0), (22, 0, 0),
        (168, 0, 0), (185, 0, 0), (41, 0, 0), (27, 0, 0),
    ],
    // 19
    [
        (201, 0, 0), (205, 0, 0), (207, 0, 0), (210, 0, 0),
        (217, 0, 0), (243, 0, 0), (23, 0, 0), (162, 0, 0),
        (169, 0, 0), (173, 0, 0), (186, 0, 0), (194, 0, 0),
        (208, 0, 0), (42, 0, 0), (191, 0, 0), (28, 0, 0),
    ],
    // 20
    [
        (0, 178, 3), (0, 181, 3), (0, 185, 3), (0, 186, 3),
        (0, 187, 3), (0, 189, 3), (0, 190, 3), (0, 196, 3),
        (0, 198, 3), (0, 228, 3), (0, 232, 3), (0, 233, 3),
        (24, 0, 0), (161, 0, 0), (163, 0, 0), (164, 0, 0),
    ],
    // 21
    [
        (66, 198, 2), (1, 198, 3), (66, 228, 2), (1, 228, 3),
        (66, 232, 2), (1, 232, 3), (66, 233, 2), (1, 233, 3),
        (0, 1, 3), (0, 135, 3), (0, 137, 3), (0, 138, 3),
        (0, 139, 3), (0, 140, 3), (0, 141, 3), (0, 143, 3),
    ],
    // 22
    [
        (66, 1, 2), (1, 1, 3), (66, 135, 2), (1, 135, 3),
        (66, 137, 2), (1, 137, 3), (66, 138, 2), (1, 138, 3),
        (66, 139, 2), (1, 139, 3), (66, 140, 2), (1, 140, 3),
        (66, 141, 2), (1, 141, 3), (66, 143, 2), (1, 143, 3),
    ],
    // 23
    [
        (85, 1, 2), (67, 1, 2), (93, 1, 2), (2, 1, 3),
        (85, 135, 2), (67, 135, 2), (93, 135, 2), (2, 135, 3),
        (85, 137, 2), (67, 137, 2), (93, 137, 2), (2, 137, 3),
        (85, 138, 2), (67, 138, 2), (93, 138, 2), (2, 138, 3),
    ],
    // 24
    [
        (86, 1, 2), (130, 1, 2), (68, 1, 2), (82, 1, 2),
        (99, 1, 2), (94, 1, 2), (104, 1, 2), (3, 1, 3),
        (86, 135, 2), (130, 135, 2), (68, 135, 2), (82, 135, 2),
        (99, 135, 2), (94, 135, 2), (104, 135, 2), (3, 135, 3),
    ],
    // 25
    [
        (170, 0, 0), (172, 0, 0), (174, 0, 0), (181, 0, 0),
        (187, 0, 0), (189, 0, 0), (195, 0, 0), (203, 0, 0),
        (209, 0, 0), (215, 0, 0), (43, 0, 0), (165, 0, 0),
        (192, 0, 0), (218, 0, 0), (211, 0, 0), (29, 0, 0),
    ],
    // 26
    [
        (0, 188, 3), (0, 191, 3), (0, 197, 3), (0, 231, 3),
        (0, 239, 3), (44, 0, 0), (166, 0, 0), (171, 0, 0),
        (193, 0, 0), (234, 0, 0), (245, 0, 0), (219, 0, 0),
        (212, 0, 0), (224, 0, 0), (229, 0, 0), (30, 0, 0),
    ],
    // 27
    [
        (0, 171, 3), (0, 206, 3), (0, 215, 3), (0, 225, 3),
        (0, 236, 3), (0, 237, 3), (220, 0, 0), (244, 0, 0),
        (213, 0, 0), (222, 0, 0), (237, 0, 0), (225, 0, 0),
        (230, 0, 0), (249, 0, 0), (31, 0, 0), (45, 0, 0),
    ],
    // 28
    [
        (214, 0, 0), (221, 0, 0), (223, 0, 0), (228, 0, 0),
        (238, 0, 0), (246, 0, 0), (248, 0, 0), (226, 0, 0),
        (231, 0, 0), (239, 0, 0), (250, 0, 0), (253, 0, 0),
        (32, 0, 0), (38, 0, 0), (55, 0, 0), (46, 0, 0),
    ],
    // 29
    [
        (232, 0, 0), (233, 0, 0), (240, 0, 0), (247, 0, 0),
        (251, 0, 0), (252, 0, 0), (254, 0, 0), (255, 0, 0),
        (33, 0, 0), (35, 0, 0), (39, 0, 0), (52, 0, 0),
        (56, 0, 0), (60, 0, 0), (63, 0, 0), (47, 0, 0),
    ],
    // 30
    [
        (0, 254, 3), (34, 0, 0), (36, 0, 0), (37, 0, 0),
        (40, 0, 0), (51, 0, 0), (53, 0, 0), (54, 0, 0),
        (57, 0, 0), (58, 0, 0), (61, 0, 0), (62, 0, 0),
        (64, 0, 0), (65, 0, 0), (147, 0, 0), (48, 0, 0),
    ],
    // 31
    [
        (66, 254, 2), (1, 254, 3), (0, 2, 3), (0, 3, 3),
        (0, 4, 3), (0, 5, 3), (0, 6, 3), (0, 7, 3),
        (0, 8, 3), (0, 11, 3), (0, 12, 3), (0, 14, 3),
        (0, 15, 3), (0, 16, 3), (0, 17, 3), (0, 18, 3),
    ],
    // 32
    [
        (85, 254, 2), (67, 254, 2), (93, 254, 2), (2, 254, 3),
        (66, 2, 2), (1, 2, 3), (66, 3, 2), (1, 3, 3),
        (66, 4, 2), (1, 4, 3), (66, 5, 2), (1, 5, 3),
        (66, 6, 2), (1, 6, 3), (66, 7, 2), (1, 7, 3),
    ],
    // 33
    [
        (86, 254, 2), (130, 254, 2), (68, 254, 2), (82, 254, 2),
        (99, 254, 2), (94, 254, 2), (104, 254, 2), (3, 254, 3),
        (85, 2, 2), (67, 2, 2), (93, 2, 2), (2, 2, 3),
        (85, 3, 2), (67, 3, 2), (93, 3, 2), (2, 3, 3),
    ],
    // 34
    [
        (86, 2, 2), (130, 2, 2), (68, 2, 2), (82, 2, 2),
        (99, 2, 2), (94, 2, 2), (104, 2, 2), (3, 2, 3),
        (86, 3, 2), (130, 3, 2), (68, 3, 2), (82, 3, 2),
        (99, 3, 2), (94, 3, 2), (104, 3, 2), (3, 3, 3),
    ],
    // 35
    [
        (85, 4, 2), (67, 4, 2), (93, 4, 2), (2, 4, 3),
        (85, 5, 2), (67, 5, 2), (93, 5, 2), (2, 5, 3),
        (85, 6, 2), (67, 6, 2), (93, 6, 2), (2, 6, 3),
        (85, 7, 2), (67, 7, 2), (93, 7, 2), (2, 7, 3),
    ],
    // 36
    [
        (86, 4, 2), (130, 4, 2), (68, 4, 2), (82, 4, 2),
        (99, 4, 2), (94, 4, 2), (104, 4, 2), (3, 4, 3),
        (86, 5, 2), (130, 5, 2), (68, 5, 2), (82, 5, 2),
        (99, 5, 2), (94, 5, 2), (104, 5, 2), (3, 5, 3),
    ],
    // 37
    [
        (86, 6, 2), (130, 6, 2), (68, 6, 2), (82, 6, 2),
        (99, 6, 2), (94, 6, 2), (104, 6, 2), (3, 6, 3),
        (86, 7, 2), (130, 7, 2), (68, 7, 2), (82, 7, 2),
        (99, 7, 2), (94, 7, 2), (104, 7, 2), (3, 7, 3),
    ],
    // 38
    [
        (66, 8, 2), (1, 8, 3), (66, 11, 2), (1, 11, 3),
        (66, 12, 2), (1, 12, 3), (66, 14, 2), (1, 14, 3),
        (66, 15, 2), (1, 15, 3), (66, 16, 2), (1, 16, 3),
        (66, 17, 2), (1, 17, 3), (66, 18, 2), (1, 18, 3),
    ],
    // 39
    [
        (85, 8, 2), (67, 8, 2), (93, 8, 2), (2, 8, 3),
        (85, 11, 2), (67, 11, 2), (93, 11, 2), (2, 11, 3),
        (85, 12, 2), (67, 12, 2), (93, 12, 2), (2, 12, 3),
        (85, 14, 2), (67, 14, 2), (93, 14, 2), (2, 14, 3),
    ],
    // 40
    [
        (86, 8, 2), (130, 8, 2), (68, 8, 2), (82, 8, 2),
        (99, 8, 2), (94, 8, 2), (104, 8, 2), (3, 8, 3),
        (86, 11, 2), (130, 11, 2), (68, 11, 2), (82, 11, 2),
        (99, 11, 2), (94, 11, 2), (104, 11, 2), (3, 11, 3),
    ],
    // 41
    [
        (66, 188, 2), (1, 188, 3), (66, 191, 2), (1, 191, 3),
        (66, 197, 2), (1, 197, 3), (66, 231, 2), (1, 231, 3),
        (66, 239, 2), (1, 239, 3), (0, 9, 3), (0, 142, 3),
        (0, 144, 3), (0, 145, 3), (0, 148, 3), (0, 159, 3),
    ],
    // 42
    [
        (85, 239, 2), (67, 239, 2), (93, 239, 2), (2, 239, 3),
        (66, 9, 2), (1, 9, 3), (66, 142, 2), (1, 142, 3),
        (66, 144, 2), (1, 144, 3), (66, 145, 2), (1, 145, 3),
        (66, 148, 2), (1, 148, 3), (66, 159, 2), (1, 159, 3),
    ],
    // 43
    [
        (86, 239, 2), (130, 239, 2), (68, 239, 2), (82, 239, 2),
        (99, 239, 2), (94, 239, 2), (104, 239, 2), (3, 239, 3),
        (85, 9, 2), (67, 9, 2), (93, 9, 2), (2, 9, 3),
        (85, 142, 2), (67, 142, 2), (93, 142, 2), (2, 142, 3),
    ],
    // 44
    [
        (86, 9, 2), (130, 9, 2), (68, 9, 2), (82, 9, 2),
        (99, 9, 2), (94, 9, 2), (104, 9, 2), (3, 9, 3),
        (86, 142, 2), (130, 142, 2), (68, 142, 2), (82, 142, 2),
        (99, 142, 2), (94, 142, 2), (104, 142, 2), (3, 142, 3),
    ],
    // 45
    [
        (0, 19, 3), (0, 20, 3), (0, 21, 3), (0, 23, 3),
        (0, 24, 3), (0, 25, 3), (0, 26, 3), (0, 27, 3),
        (0, 28, 3), (0, 29, 3), (0, 30, 3), (0, 31, 3),
        (0, 127, 3), (0, 220, 3), (0, 249, 3), (49, 0, 0),
    ],
    // 46
    [
        (66, 28, 2), (1, 28, 3), (66, 29, 2), (1, 29, 3),
        (66, 30, 2), (1, 30, 3), (66, 31, 2), (1, 31, 3),
        (66, 127, 2), (1, 127, 3), (66, 220, 2), (1, 220, 3),
        (66, 249, 2), (1, 249, 3), (50, 0, 0), (59, 0, 0),
    ],
    // 47
    [
        (85, 127, 2), (67, 127, 2), (93, 127, 2), (2, 127, 3),
        (85, 220, 2), (67, 220, 2), (93, 220, 2), (2, 220, 3),
        (85, 249, 2), (67, 249, 2), (93, 249, 2), (2, 249, 3),
        (0, 10, 3), (0, 13, 3), (0, 22, 3), (0, 0, 4),
    ],
    // 48
    [
        (86, 249, 2), (130, 249, 2), (68, 249, 2), (82, 249, 2),
        (99, 249, 2), (94, 249, 2), (104, 249, 2), (3, 249, 3),
        (66, 10, 2), (1, 10, 3), (66, 13, 2), (1, 13, 3),
        (66, 22, 2), (1, 22, 3), (0, 0, 4), (0, 0, 4),
    ],
    // 49
    [
        (85, 10, 2), (67, 10, 2), (93, 10, 2), (2, 10, 3),
        (85, 13, 2), (67, 13, 2), (93, 13, 2), (2, 13, 3),
        (85, 22, 2), (67, 22, 2), (93, 22, 2), (2, 22, 3),
        (0, 0, 4), (0, 0, 4), (0, 0, 4), (0, 0, 4),
    ],
    // 50
    [
        (86, 10, 2), (130, 10, 2), (68, 10, 2), (82, 10, 2),
        (99, 10, 2), (94, 10, 2), (104, 10, 2), (3, 10, 3),
        (86, 13, 2), (130, 13, 2), (68, 13, 2), (82, 13, 2),
        (99, 13, 2), (94, 13, 2), (104, 13, 2), (3, 13, 3),
    ],
    // 51
    [
        (86, 12, 2), (130, 12, 2), (68, 12, 2), (82, 12, 2),
        (99, 12, 2), (94, 12, 2), (104, 12, 2), (3, 12, 3),
        (86, 14, 2), (130, 14, 2), (68, 14, 2), (82, 14, 2),
        (99, 14, 2), (94, 14, 2), (104, 14, 2), (3, 14, 3),
    ],
    // 52
    [
        (85, 15, 2), (67, 15, 2), (93, 15, 2), (2, 15, 3),
        (85, 16, 2), (67, 16, 2), (93, 16, 2), (2, 16, 3),
        (85, 17, 2), (67, 17, 2), (93, 17, 2), (2, 17, 3),
        (85, 18, 2), (67, 18, 2), (93, 18, 2), (2, 18, 3),
    ],
    // 53
    [
        (86, 15, 2), (130, 15, 2), (68, 15, 2), (82, 15, 2),
        (99, 15, 2), (94, 15, 2), (104, 15, 2), (3, 15, 3),
        (86, 16, 2), (130, 16, 2), (68, 16, 2), (82, 16, 2),
        (99, 16, 2), (94, 16, 2), (104, 16, 2), (3, 16, 3),
    ],
    // 54
    [
        (86, 17, 2), (130, 17, 2), (68, 17, 2), (82, 17, 2),
        (99, 17, 2), (94, 17, 2), (104, 17, 2), (3, 17, 3),
        (86, 18, 2), (130, 18, 2), (68, 18, 2), (82, 18, 2),
        (99, 18, 2), (94, 18, 2), (104, 18, 2), (3, 18, 3),
    ],
    // 55
    [
        (66, 19, 2), (1, 19, 3), (66, 20, 2), (1, 20, 3),
        (66, 21, 2), (1, 21, 3), (66, 23, 2), (1, 23, 3),
        (66, 24, 2), (1, 24, 3), (66, 25, 2), (1, 25, 3),
        (66, 26, 2), (1, 26, 3), (66, 27, 2), (1, 27, 3),
    ],
    // 56
    [
        (85, 19, 2), (67, 19, 2), (93, 19, 2), (2, 19, 3),
        (85, 20, 2), (67, 20, 2), (93, 20, 2), (2, 20, 3),
        (85, 21, 2), (67, 21, 2), (93, 21, 2), (2, 21, 3),
        (85, 23, 2), (67, 23, 2), (93, 23, 2), (2, 23, 3),
    ],
    // 57
    [
        (86, 19, 2), (130, 19, 2), (68, 19, 2), (82, 19, 2),
        (99, 19, 2), (94, 19, 2), (104, 19, 2), (3, 19, 3),
        (86, 20, 2), (130, 20, 2), (68, 20, 2), (82, 20, 2),
        (99, 20, 2), (94, 20, 2), (104, 20, 2), (3, 20, 3),
    ],
    // 58
    [
        (86, 21, 2), (130, 21, 2), (68, 21, 2), (82, 21, 2),
        (99, 21, 2), (94, 21, 2), (104, 21, 2), (3, 21, 3),
        (86, 23, 2), (130, 23, 2), (68, 23, 2), (82, 23, 2),
        (99, 23, 2), (94, 23, 2), (104, 23, 2), (3, 23, 3),
    ],
    // 59
    [
        (86, 22, 2), (130, 22, 2), (68, 22, 2), (82, 22, 2),
        (99, 22, 2), (94, 22, 2), (104, 22, 2), (3, 22, 3),
        (0, 0, 4), (0, 0, 4), (0, 0, 4), (0, 0, 4),
        (0, 0, 4), (0, 0, 4), (0, 0, 4), (0, 0, 4),
    ],
    // 60
    [
        (85, 24, 2), (67, 24, 2), (93, 24, 2), (2, 24, 3),
        (85, 25, 2), (67, 25, 2), (93, 25, 2), (2, 25, 3),
        (85, 26, 2), (67, 26, 2), (93, 26, 2), (2, 26, 3),
        (85, 27, 2), (67, 27, 2), (93, 27, 2), (2, 27, 3),
    ],
    // 61
    [
        (86, 24, 2), (130, 24, 2), (68, 24, 2), (82, 24, 2),
        (99, 24, 2), (94, 24, 2), (104, 24, 2), (3, 24, 3),
        (86, 25, 2), (130, 25, 2), (68, 25, 2), (82, 25, 2),
        (99, 25, 2), (94, 25, 2), (104, 25, 2), (3, 25, 3),
    ],
    // 62
    [
        (86, 26, 2), (130, 26, 2), (68, 26, 2), (82, 26, 2),
        (99, 26, 2), (94, 26, 2), (104, 26, 2), (3, 26, 3),
        (86, 27, 2), (130, 27, 2), (68, 27, 2), (82, 27, 2),
        (99, 27, 2), (94, 27, 2), (104, 27, 2), (3, 27, 3),
    ],
    // 63
    [
        (85, 28, 2), (67, 28, 2), (93, 28, 2), (2, 28, 3),
        (85, 29, 2), (67, 29, 2), (93, 29, 2), (2, 29, 3),
        (85, 30, 2), (67, 30, 2), (93, 30, 2), (2, 30, 3),
        (85, 31, 2), (67, 31, 2), (93, 31, 2), (2, 31, 3),
    ],
    // 64
    [
        (86, 28, 2), (130, 28, 2), (68, 28, 2), (82, 28, 2),
        (99, 28, 2), (94, 28, 2), (104, 28, 2), (3, 28, 3),
        (86, 29, 2), (130, 29, 2), (68, 29, 2), (82, 29, 2),
        (99, 29, 2), (94, 29, 2), (104, 29, 2), (3, 29, 3),
    ],
    // 65
    [
        (86, 30, 2), (130, 30, 2), (68, 30, 2), (82, 30, 2),
        (99, 30, 2), (94, 30, 2), (104, 30, 2), (3, 30, 3),
        (86, 31, 2), (130, 31, 2), (68, 31, 2), (82, 31, 2),
        (99, 31, 2), (94, 31, 2), (104, 31, 2), (3, 31, 3),
    ],
    // 66
    [
        (0, 48, 3), (0, 49, 3), (0, 50, 3), (0, 97, 3),
        (0, 99, 3), (0, 101, 3), (0, 105, 3), (0, 111, 3),
        (0, 115, 3), (0, 116, 3), (70, 0, 0), (81, 0, 0),
        (84, 0, 0), (89, 0, 0), (91, 0, 0), (92, 0, 0),
    ],
    // 67
    [
        (66, 115, 2), (1, 115, 3), (66, 116, 2), (1, 116, 3),
        (0, 32, 3), (0, 37, 3), (0, 45, 3), (0, 46, 3),
        (0, 47, 3), (0, 51, 3), (0, 52, 3), (0, 53, 3),
        (0, 54, 3), (0, 55, 3), (0, 56, 3), (0, 57, 3),
    ],
    // 68
    [
        (85, 115, 2), (67, 115, 2), (93, 115, 2), (2, 115, 3),
        (85, 116, 2), (67, 116, 2), (93, 116, 2), (2, 116, 3),
        (66, 32, 2), (1, 32, 3), (66, 37, 2), (1, 37, 3),
        (66, 45, 2), (1, 45, 3), (66, 46, 2), (1, 46, 3),
    ],
    // 69
    [
        (85, 32, 2), (67, 32, 2), (93, 32, 2), (2, 32, 3),
        (85, 37, 2), (67, 37, 2), (93, 37, 2), (2, 37, 3),
        (85, 45, 2), (67, 45, 2), (93, 45, 2), (2, 45, 3),
        (85, 46, 2), (67, 46, 2), (93, 46, 2), (2, 46, 3),
    ],
    // 70
    [
        (86, 32, 2), (130, 32, 2), (68, 32, 2), (82, 32, 2),
        (99, 32, 2), (94, 32, 2), (104, 32, 2), (3, 32, 3),
        (86, 37, 2), (130, 37, 2), (68, 37, 2), (82, 37, 2),
        (99, 37, 2), (94, 37, 2), (104, 37, 2), (3, 37, 3),
    ],
    // 71
    [
        (85, 33, 2), (67, 33, 2), (93, 33, 2), (2, 33, 3),
        (85, 34, 2), (67, 34, 2), (93, 34, 2), (2, 34, 3),
        (85, 40, 2), (67, 40, 2), (93, 40, 2), (2, 40, 3),
        (85, 41, 2), (67, 41, 2), (93, 41, 2), (2, 41, 3),
    ],
    // 72
    [
        (86, 33, 2), (130, 33, 2), (68, 33, 2), (82, 33, 2),
        (99, 33, 2), (94, 33, 2), (104, 33, 2), (3, 33, 3),
        (86, 34, 2), (130, 34, 2), (68, 34, 2), (82, 34, 2),
        (99, 34, 2), (94, 34, 2), (104, 34, 2), (3, 34, 3),
    ],
    // 73
    [
        (86, 124, 2), (130, 124, 2), (68, 124, 2), (82, 124, 2),
        (99, 124, 2), (94, 124, 2), (104, 124, 2), (3, 124, 3),
        (85, 35, 2), (67, 35, 2), (93, 35, 2), (2, 35, 3),
        (85, 62, 2), (67, 62, 2), (93, 62, 2), (2, 62, 3),
    ],
    // 74
    [
        (86, 35, 2), (130, 35, 2), (68, 35, 2), (82, 35, 2),
        (99, 35, 2), (94, 35, 2), (104, 35, 2), (3, 35, 3),
        (86, 62, 2), (130, 62, 2), (68, 62, 2), (82, 62, 2),
        (99, 62, 2), (94, 62, 2), (104, 62, 2), (3, 62, 3),
    ],
    // 75
    [
        (85, 38, 2), (67, 38, 2), (93, 38, 2), (2, 38, 3),
        (85, 42, 2), (67, 42, 2), (93, 42, 2), (2, 42, 3),
        (85, 44, 2), (67, 44, 2), (93, 44, 2), (2, 44, 3),
        (85, 59, 2), (67, 59, 2), (93, 59, 2), (2, 59, 3),
    ],
    // 76
    [
        (86, 38, 2), (130, 38, 2), (68, 38, 2), (82, 38, 2),
        (99, 38, 2), (94, 38, 2), (104, 38, 2), (3, 38, 3),
        (86, 42, 2), (130, 42, 2), (68, 42, 2), (82, 42, 2),
        (99, 42, 2), (94, 42, 2), (104, 42, 2), (3, 42, 3),
    ],
    // 77
    [
        (86, 63, 2), (130, 63, 2), (68, 63, 2), (82, 63, 2),
        (99, 63, 2), (94, 63, 2), (104, 63, 2), (3, 63, 3),
        (85, 39, 2), (67, 39, 2), (93, 39, 2), (2, 39, 3),
        (85, 43, 2), (67, 43, 2), (93, 43, 2), (2, 43, 3),
    ],
    // 78
    [
        (86, 39, 2), (130, 39, 2), (68, 39, 2), (82, 39, 2),
        (99, 39, 2), (94, 39, 2), (104, 39, 2), (3, 39, 3),
        (86, 43, 2), (130, 43, 2), (68, 43, 2), (82, 43, 2),
        (99, 43, 2), (94, 43, 2), (104, 43, 2), (3, 43, 3),
    ],
    // 79
    [
        (86, 40, 2), (130, 40, 2), (68, 40, 2), (82, 40, 2),
        (99, 40, 2), (94, 40, 2), (104, 40, 2), (3, 40, 3),
        (86, 41, 2), (130, 41, 2), (68, 41, 2), (82, 41, 2),
        (99, 41, 2), (94, 41, 2), (104, 41, 2), (3, 41, 3),
    ],
    // 80
    [
        (86, 44, 2), (130, 44, 2), (68, 44, 2), (82, 44, 2),
        (99, 44, 2), (94, 44, 2), (104, 44, 2), (3, 44, 3),
        (86, 59, 2), (130, 59, 2), (68, 59, 2), (82, 59, 2),
        (99, 59, 2), (94, 59, 2), (104, 59, 2), (3, 59, 3),
    ],
    // 81
    [
        (86, 45, 2), (130, 45, 2), (68, 45, 2), (82, 45, 2),
        (99, 45, 2), (94, 45, 2), (104, 45, 2), (3, 45, 3),
        (86, 46, 2), (130, 46, 2), (68, 46, 2), (82, 46, 2),
        (99, 46, 2), (94, 46, 2), (104, 46, 2), (3, 46, 3),
    ],
    // 82
    [
        (66, 47, 2), (1, 47, 3), (66, 51, 2), (1, 51, 3),
        (66, 52, 2), (1, 52, 3), (66, 53, 2), (1, 53, 3),
        (66, 54, 2), (1, 54, 3), (66, 55, 2), (1, 55, 3),
        (66, 56, 2), (1, 56, 3), (66, 57, 2), (1, 57, 3),
    ],
    // 83
    [
        (85, 47, 2), (67, 47, 2), (93, 47, 2), (2, 47, 3),
        (85, 51, 2), (67, 51, 2), (93, 51, 2), (2, 51, 3),
        (85, 52, 2), (67, 52, 2), (93, 52, 2), (2, 52, 3),
        (85, 53, 2), (67, 53, 2), (93, 53, 2), (2, 53, 3),
    ],
    // 84
    [
        (86, 47, 2), (130, 47, 2), (68, 47, 2), (82, 47, 2),
        (99, 47, 2), (94, 47, 2), (104, 47, 2), (3, 47, 3),
        (86, 51, 2), (130, 51, 2), (68, 51, 2), (82, 51, 2),
        (99, 51, 2), (94, 51, 2), (104, 51, 2), (3, 51, 3),
    ],
    // 85
    [
        (66, 48, 2), (1, 48, 3), (66, 49, 2), (1, 49, 3),
        (66, 50, 2), (1, 50, 3), (66, 97, 2), (1, 97, 3),
        (66, 99, 2), (1, 99, 3), (66, 101, 2), (1, 101, 3),
        (66, 105, 2), (1, 105, 3), (66, 111, 2), (1, 111, 3),
    ],
    // 86
    [
        (85, 48, 2), (67, 48, 2), (93, 48, 2), (2, 48, 3),
        (85, 49, 2), (67, 49, 2), (93, 49, 2), (2, 49, 3),
        (85, 50, 2), (67, 50, 2), (93, 50, 2), (2, 50, 3),
        (85, 97, 2), (67, 97, 2), (93, 97, 2), (2, 97, 3),
    ],
    // 87
    [
        (86, 48, 2), (130, 48, 2), (68, 48, 2), (82, 48, 2),
        (99, 48, 2), (94, 48, 2), (104, 48, 2), (3, 48, 3),
        (86, 49, 2), (130, 49, 2), (68, 49, 2), (82, 49, 2),
        (99, 49, 2), (94, 49, 2), (104, 49, 2), (3, 49, 3),
    ],
    // 88
    [
        (86, 50, 2), (130, 50, 2), (68, 50, 2), (82, 50, 2),
        (99, 50, 2), (94, 50, 2), (104, 50, 2), (3, 50, 3),
        (86, 97, 2), (130, 97, 2), (68, 97, 2), (82, 97, 2),
        (99, 97, 2), (94, 97, 2), (104, 97, 2), (3, 97, 3),
    ],
    // 89
    [
        (86, 52, 2), (130, 52, 2), (68, 52, 2), (82, 52, 2),
        (99, 52, 2), (94, 52, 2), (104, 52, 2), (3, 52, 3),
        (86, 53, 2), (130, 53, 2), (68, 53, 2), (82, 53, 2),
        (99, 53, 2), (94, 53, 2), (104, 53, 2), (3, 53, 3),
    ],
    // 90
    [
        (85, 54, 2), (67, 54, 2), (93, 54, 2), (2, 54, 3),
        (85, 55, 2), (67, 55, 2), (93, 55, 2), (2, 55, 3),
        (85, 56, 2), (67, 56, 2), (93, 56, 2), (2, 56, 3),
        (85, 57, 2), (67, 57, 2), (93, 57, 2), (2, 57, 3),
    ],
    // 91
    [
        (86, 54, 2), (130, 54, 2), (68, 54, 2), (82, 54, 2),
        (99, 54, 2), (94, 54, 2), (104, 54, 2), (3, 54, 3),
        (86, 55, 2), (130, 55, 2), (68, 55, 2), (82, 55, 2),
        (99, 55, 2), (94, 55, 2), (104, 55, 2), (3, 55, 3),
    ],
    // 92
    [
        (86, 56, 2), (130, 56, 2), (68, 56, 2), (82, 56, 2),
        (99, 56, 2), (94, 56, 2), (104, 56, 2), (3, 56, 3),
        (86, 57, 2), (130, 57, 2), (68, 57, 2), (82, 57, 2),
        (99, 57, 2), (94, 57, 2), (104, 57, 2), (3, 57, 3),
    ],
    // 93
    [
        (0, 61, 3), (0, 65, 3), (0, 95, 3), (0, 98, 3),
        (0, 100, 3), (0, 102, 3), (0, 103, 3), (0, 104, 3),
        (0, 108, 3), (0, 109, 3), (0, 110, 3), (0, 112, 3),
        (0, 114, 3), (0, 117, 3), (97, 0, 0), (103, 0, 0),
    ],
    // 94
    [
        (66, 108, 2), (1, 108, 3), (66, 109, 2), (1, 109, 3),
        (66, 110, 2), (1, 110, 3), (66, 112, 2), (1, 112, 3),
        (66, 114, 2), (1, 114, 3), (66, 117, 2), (1, 117, 3),
        (0, 58, 3), (0, 66, 3), (0, 67, 3), (0, 68, 3),
    ],
    // 95
    [
        (85, 114, 2), (67, 114, 2), (93, 114, 2), (2, 114, 3),
        (85, 117, 2), (67, 117, 2), (93, 117, 2), (2, 117, 3),
        (66, 58, 2), (1, 58, 3), (66, 66, 2), (1, 66, 3),
        (66, 67, 2), (1, 67, 3), (66, 68, 2), (1, 68, 3),
    ],
    // 96
    [
        (85, 58, 2), (67, 58, 2), (93, 58, 2), (2, 58, 3),
        (85, 66, 2), (67, 66, 2), (93, 66, 2), (2, 66, 3),
        (85, 67, 2), (67, 67, 2), (93, 67, 2), (2, 67, 3),
        (85, 68, 2), (67, 68, 2), (93, 68, 2), (2, 68, 3),
    ],
    // 97
    [
        (86, 58, 2), (130, 58, 2), (68, 58, 2), (82, 58, 2),
        (99, 58, 2), (94, 58, 2), (104, 58, 2), (3, 58, 3),
        (86, 66, 2), (130, 66, 2), (68, 66, 2), (82, 66, 2),
        (99, 66, 2), (94, 66, 2), (104, 66, 2), (3, 66, 3),
    ],
    // 98
    [
        (86, 60, 2), (130, 60, 2), (68, 60, 2), (82, 60, 2),
        (99, 60, 2), (94, 60, 2), (104, 60, 2), (3, 60, 3),
        (86, 96, 2), (130, 96, 2), (68, 96, 2), (82, 96, 2),
        (99, 96, 2), (94, 96, 2), (104, 96, 2), (3, 96, 3),
    ],
    // 99
    [
        (66, 61, 2), (1, 61, 3), (66, 65, 2), (1, 65, 3),
        (66, 95, 2), (1, 95, 3), (66, 98, 2), (1, 98, 3),
        (66, 100, 2), (1, 100, 3), (66, 102, 2), (1, 102, 3),
        (66, 103, 2), (1, 103, 3), (66, 104, 2), (1, 104, 3),
    ],
    // 100
    [
        (85, 61, 2), (67, 61, 2), (93, 61, 2), (2, 61, 3),
        (85, 65, 2), (67, 65, 2), (93, 65, 2), (2, 65, 3),
        (85, 95, 2), (67, 95, 2), (93, 95, 2), (2, 95, 3),
        (85, 98, 2), (67, 98, 2), (93, 98, 2), (2, 98, 3),
    ],
    // 101
    [
        (86, 61, 2), (130, 61, 2), (68, 61, 2), (82, 61, 2),
        (99, 61, 2), (94, 61, 2), (104, 61, 2), (3, 61, 3),
        (86, 65, 2), (130, 65, 2), (68, 65, 2), (82, 65, 2),
        (99, 65, 2), (94, 65, 2), (104, 65, 2), (3, 65, 3),
    ],
    // 102
    [
        (86, 64, 2), (130, 64, 2), (68, 64, 2), (82, 64, 2),
        (99, 64, 2), (94, 64, 2), (104, 64, 2), (3, 64, 3),
        (86, 91, 2), (130, 91, 2), (68, 91, 2), (82, 91, 2),
        (99, 91, 2), (94, 91, 2), (104, 91, 2), (3, 91, 3),
    ],
    // 103
    [
        (86, 67, 2), (130, 67, 2), (68, 67, 2), (82, 67, 2),
        (99, 67, 2), (94, 67, 2), (104, 67, 2), (3, 67, 3),
        (86, 68, 2), (130, 68, 2), (68, 68, 2), (82, 68, 2),
        (99, 68, 2), (94, 68, 2), (104, 68, 2), (3, 68, 3),
    ],
    // 104
    [
        (0, 69, 3), (0, 70, 3), (0, 71, 3), (0, 72, 3),
        (0, 73, 3), (0, 74, 3), (0, 75, 3), (0, 76, 3),
        (0, 77, 3), (0, 78, 3), (0, 79, 3), (0, 80, 3),
        (0, 81, 3), (0, 82, 3), (0, 83, 3), (0, 84, 3),
    ],
    // 105
    [
        (66, 69, 2), (1, 69, 3), (66, 70, 2), (1, 70, 3),
        (66, 71, 2), (1, 71, 3), (66, 72, 2), (1, 72, 3),
        (66, 73, 2), (1, 73, 3), (66, 74, 2), (1, 74, 3),
        (66, 75, 2), (1, 75, 3), (66, 76, 2), (1, 76, 3),
    ],
    // 106
    [
        (85, 69, 2), (67, 69, 2), (93, 69, 2), (2, 69, 3),
        (85, 70, 2), (67, 70, 2), (93, 70, 2), (2, 70, 3),
        (85, 71, 2), (67, 71, 2), (93, 71, 2), (2, 71, 3),
        (85, 72, 2), (67, 72, 2), (93, 72, 2), (2, 72, 3),
    ],
    // 107
    [
        (86, 69, 2), (130, 69, 2), (68, 69, 2), (82, 69, 2),
        (99, 69, 2), (94, 69, 2), (104, 69, 2), (3, 69, 3),
        (86, 70, 2), (130, 70, 2), (68, 70, 2), (82, 70, 2),
        (99, 70, 2), (94, 70, 2), (104, 70, 2), (3, 70, 3),
    ],
    // 108
    [
        (86, 71, 2), (130, 71, 2), (68, 71, 2), (82, 71, 2),
        (99, 71, 2), (94, 71, 2), (104, 71, 2), (3, 71, 3),
        (86, 72, 2), (130, 72, 2), (68, 72, 2), (82, 72, 2),
        (99, 72, 2), (94, 72, 2), (104, 72, 2), (3, 72, 3),
    ],
    // 109
    [
        (85, 73, 2), (67, 73, 2), (93, 73, 2), (2, 73, 3),
        (85, 74, 2), (67, 74, 2), (93, 74, 2), (2, 74, 3),
        (85, 75, 2), (67, 75, 2), (93, 75, 2), (2, 75, 3),
        (85, 76, 2), (67, 76, 2), (93, 76, 2), (2, 76, 3),
    ],
    // 110
    [
        (86, 73, 2), (130, 73, 2), (68, 73, 2), (82, 73, 2),
        (99, 73, 2), (94, 73, 2), (104, 73, 2), (3, 73, 3),
        (86, 74, 2), (130, 74, 2), (68, 74, 2), (82, 74, 2),
        (99, 74, 2), (94, 74, 2), (104, 74, 2), (3, 74, 3),
    ],
    // 111
    [
        (86, 75, 2), (130, 75, 2), (68, 75, 2), (82, 75, 2),
        (99, 75, 2), (94, 75, 2), (104, 75, 2), (3, 75, 3),
        (86, 76, 2), (130, 76, 2), (68, 76, 2), (82, 76, 2),
        (99, 76, 2), (94, 76, 2), (104, 76, 2), (3, 76, 3),
    ],
    // 112
    [
        (66, 77, 2), (1, 77, 3), (66, 78, 2), (1, 78, 3),
        (66, 79, 2), (1, 79, 3), (66, 80, 2), (1, 80, 3),
        (66, 81, 2), (1, 81, 3), (66, 82, 2), (1, 82, 3),
        (66, 83, 2), (1, 83, 3), (66, 84, 2), (1, 84, 3),
    ],
    // 113
    [
        (85, 77, 2), (67, 77, 2), (93, 77, 2), (2, 77, 3),
        (85, 78, 2), (67, 78, 2), (93, 78, 2), (2, 78, 3),
        (85, 79, 2), (67, 79, 2), (93, 79, 2), (2, 79, 3),
        (85, 80, 2), (67, 80, 2), (93, 80, 2), (2, 80, 3),
    ],
    // 114
    [
        (86, 77, 2), (130, 77, 2), (68, 77, 2), (82, 77, 2),
        (99, 77, 2), (94, 77, 2), (104, 77, 2), (3, 77, 3),
        (86, 78, 2), (130, 78, 2), (68, 78, 2), (82, 78, 2),
        (99, 78, 2), (94, 78, 2), (104, 78, 2), (3, 78, 3),
    ],
    // 115
    [
        (86, 79, 2), (130, 79, 2), (68, 79, 2), (82, 79, 2),
        (99, 79, 2), (94, 79, 2), (104, 79, 2), (3, 79, 3),
        (86, 80, 2), (130, 80, 2), (68, 80, 2), (82, 80, 2),
        (99, 80, 2), (94, 80, 2), (104, 80, 2), (3, 80, 3),
    ],
    // 116
    [
        (85, 81, 2), (67, 81, 2), (93, 81, 2), (2, 81, 3),
        (85, 82, 2), (67, 82, 2), (93, 82, 2), (2, 82, 3),
        (85, 83, 2), (67, 83, 2), (93, 83, 2), (2, 83, 3),
        (85, 84, 2), (67, 84, 2), (93, 84, 2), (2, 84, 3),
    ],
    // 117
    [
        (86, 81, 2), (130, 81, 2), (68, 81, 2), (82, 81, 2),
        (99, 81, 2), (94, 81, 2), (104, 81, 2), (3, 81, 3),
        (86, 82, 2), (130, 82, 2), (68, 82, 2), (82, 82, 2),
        (99, 82, 2), (94, 82, 2), (104, 82, 2), (3, 82, 3),
    ],
    // 118
    [
        (86, 83, 2), (130, 83, 2), (68, 83, 2), (82, 83, 2),
        (99, 83, 2), (94, 83, 2), (104, 83, 2), (3, 83, 3),
        (86, 84, 2), (130, 84, 2), (68, 84, 2), (82, 84, 2),
        (99, 84, 2), (94, 84, 2), (104, 84, 2), (3, 84, 3),
    ],
    // 119
    [
        (66, 85, 2), (1, 85, 3), (66, 86, 2), (1, 86, 3),
        (66, 87, 2), (1, 87, 3), (66, 89, 2), (1, 89, 3),
        (66, 106, 2), (1, 106, 3), (66, 107, 2), (1, 107, 3),
        (66, 113, 2), (1, 113, 3), (66, 118, 2), (1, 118, 3),
    ],
    // 120
    [
        (85, 85, 2), (67, 85, 2), (93, 85, 2), (2, 85, 3),
        (85, 86, 2), (67, 86, 2), (93, 86, 2), (2, 86, 3),
        (85, 87, 2), (67, 87, 2), (93, 87, 2), (2, 87, 3),
        (85, 89, 2), (67, 89, 2), (93, 89, 2), (2, 89, 3),
    ],
    // 121
    [
        (86, 85, 2), (130, 85, 2), (68, 85, 2), (82, 85, 2),
        (99, 85, 2), (94, 85, 2), (104, 85, 2), (3, 85, 3),
        (86, 86, 2), (130, 86, 2), (68, 86, 2), (82, 86, 2),
        (99, 86, 2), (94, 86, 2), (104, 86, 2), (3, 86, 3),
    ],
    // 122
    [
        (86, 87, 2), (130, 87, 2), (68, 87, 2), (82, 87, 2),
        (99, 87, 2), (94, 87, 2), (104, 87, 2), (3, 87, 3),
        (86, 89, 2), (130, 89, 2), (68, 89, 2), (82, 89, 2),
        (99, 89, 2), (94, 89, 2), (104, 89, 2), (3, 89, 3),
    ],
    // 123
    [
        (86, 88, 2), (130, 88, 2), (68, 88, 2), (82, 88, 2),
        (99, 88, 2), (94, 88, 2), (104, 88, 2), (3, 88, 3),
        (86, 90, 2), (130, 90, 2), (68, 90, 2), (82, 90, 2),
        (99, 90, 2), (94, 90, 2), (104, 90, 2), (3, 90, 3),
    ],
    // 124
    [
        (66, 92, 2), (1, 92, 3), (66, 195, 2), (1, 195, 3),
        (66, 208, 2), (1, 208, 3), (0, 128, 3), (0, 130, 3),
        (0, 131, 3), (0, 162, 3), (0, 184, 3), (0, 194, 3),
        (0, 224, 3), (0, 226, 3), (177, 0, 0), (188, 0, 0),
    ],
    // 125
    [
        (85, 92, 2), (67, 92, 2), (93, 92, 2), (2, 92, 3),
        (85, 195, 2), (67, 195, 2), (93, 195, 2), (2, 195, 3),
        (85, 208, 2), (67, 208, 2), (93, 208, 2), (2, 208, 3),
        (66, 128, 2), (1, 128, 3), (66, 130, 2), (1, 130, 3),
    ],
    // 126
    [
        (86, 92, 2), (130, 92, 2), (68, 92, 2), (82, 92, 2),
        (99, 92, 2), (94, 92, 2), (104, 92, 2), (3, 92, 3),
        (86, 195, 2), (130, 195, 2), (68, 195, 2), (82, 195, 2),
        (99, 195, 2), (94, 195, 2), (104, 195, 2), (3, 195, 3),
    ],
    // 127
    [
        (86, 93, 2), (130, 93, 2), (68, 93, 2), (82, 93, 2),
        (99, 93, 2), (94, 93, 2), (104, 93, 2), (3, 93, 3),
        (86, 126, 2), (130, 126, 2), (68, 126, 2), (82, 126, 2),
        (99, 126, 2), (94, 126, 2), (104, 126, 2), (3, 126, 3),
    ],
    // 128
    [
        (86, 94, 2), (130, 94, 2), (68, 94, 2), (82, 94, 2),
        (99, 94, 2), (94, 94, 2), (104, 94, 2), (3, 94, 3),
        (86, 125, 2), (130, 125, 2), (68, 125, 2), (82, 125, 2),
        (99, 125, 2), (94, 125, 2), (104, 125, 2), (3, 125, 3),
    ],
    // 129
    [
        (86, 95, 2), (130, 95, 2), (68, 95, 2), (82, 95, 2),
        (99, 95, 2), (94, 95, 2), (104, 95, 2), (3, 95, 3),
        (86, 98, 2), (130, 98, 2), (68, 98, 2), (82, 98, 2),
        (99, 98, 2), (94, 98, 2), (104, 98, 2), (3, 98, 3),
    ],
    // 130
    [
        (85, 99, 2), (67, 99, 2), (93, 99, 2), (2, 99, 3),
        (85, 101, 2), (67, 101, 2), (93, 101, 2), (2, 101, 3),
        (85, 105, 2), (67, 105, 2), (93, 105, 2), (2, 105, 3),
        (85, 111, 2), (67, 111, 2), (93, 111, 2), (2, 111, 3),
    ],
    // 131
    [
        (86, 99, 2), (130, 99, 2), (68, 99, 2), (82, 99, 2),
        (99, 99, 2), (94, 99, 2), (104, 99, 2), (3, 99, 3),
        (86, 101, 2), (130, 101, 2), (68, 101, 2), (82, 101, 2),
        (99, 101, 2), (94, 101, 2), (104, 101, 2), (3, 101, 3),
    ],
    // 132
    [
        (85, 100, 2), (67, 100, 2), (93, 100, 2), (2, 100, 3),
        (85, 102, 2), (67, 102, 2), (93, 102, 2), (2, 102, 3),
        (85, 103, 2), (67, 103, 2), (93, 103, 2), (2, 103, 3),
        (85, 104, 2), (67, 104, 2), (93, 104, 2), (2, 104, 3),
    ],
    // 133
    [
        (86, 100, 2), (130, 100, 2), (68, 100, 2), (82, 100, 2),
        (99, 100, 2), (94, 100, 2), (104, 100, 2), (3, 100, 3),
        (86, 102, 2), (130, 102, 2), (68, 102, 2), (82, 102, 2),
        (99, 102, 2), (94, 102, 2), (104, 102, 2), (3, 102, 3),
    ],
    // 134
    [
        (86, 103, 2), (130, 103, 2), (68, 103, 2), (82, 103, 2),
        (99, 103, 2), (94, 103, 2), (104, 103, 2), (3, 103, 3),
        (86, 104, 2), (130, 104, 2), (68, 104, 2), (82, 104, 2),
        (99, 104, 2), (94, 104, 2), (104, 104, 2), (3, 104, 3),
    ],
    // 135
    [
        (86, 105, 2), (130, 105, 2), (68, 105, 2), (82, 105, 2),
        (99, 105, 2), (94, 105, 2), (104, 105, 2), (3, 105, 3),
        (86, 111, 2), (130, 111, 2), (68, 111, 2), (82, 111, 2),
        (99, 111, 2), (94, 111, 2), (104, 111, 2), (3, 111, 3),
    ],
    // 136
    [
        (85, 106, 2), (67, 106, 2), (93, 106, 2), (2, 106, 3),
        (85, 107, 2), (67, 107, 2), (93, 107, 2), (2, 107, 3),
        (85, 113, 2), (67, 113, 2), (93, 113, 2), (2, 113, 3),
        (85, 118, 2), (67, 118, 2), (93, 118, 2), (2, 118, 3),
    ],
    // 137
    [
        (86, 106, 2), (130, 106, 2), (68, 106, 2), (82, 106, 2),
        (99, 106, 2), (94, 106, 2), (104, 106, 2), (3, 106, 3),
        (86, 107, 2), (130, 107, 2), (68, 107, 2), (82, 107, 2),
        (99, 107, 2), (94, 107, 2), (104, 107, 2), (3, 107, 3),
    ],
    // 138
    [
        (85, 108, 2), (67, 108, 2), (93, 108, 2), (2, 108, 3),
        (85, 109, 2), (67, 109, 2), (93, 109, 2), (2, 109, 3),
        (85, 110, 2), (67, 110, 2), (93, 110, 2), (2, 110, 3),
        (85, 112, 2), (67, 112, 2), (93, 112, 2), (2, 112, 3),
    ],
    // 139
    [
        (86, 108, 2), (130, 108, 2), (68, 108, 2), (82, 108, 2),
        (99, 108, 2), (94, 108, 2), (104, 108, 2), (3, 108, 3),
        (86, 109, 2), (130, 109, 2), (68, 109, 2), (82, 109, 2),
        (99, 109, 2), (94, 109, 2), (104, 109, 2), (3, 109, 3),
    ],
    // 140
    [
        (86, 110, 2), (130, 110, 2), (68, 110, 2), (82, 110, 2),
        (99, 110, 2), (94, 110, 2), (104, 110, 2), (3, 110, 3),
        (86, 112, 2), (130, 112, 2), (68, 112, 2), (82, 112, 2),
        (99, 112, 2), (94, 112, 2), (104, 112, 2), (3, 112, 3),
    ],
    // 141
    [
        (86, 113, 2), (130, 113, 2), (68, 113, 2), (82, 113, 2),
        (99, 113, 2), (94, 113, 2), (104, 113, 2), (3, 113, 3),
        (86, 118, 2), (130, 118, 2), (68, 118, 2), (82, 118, 2),
        (99, 118, 2), (94, 118, 2), (104, 118, 2), (3, 118, 3),
    ],
    // 142
    [
        (86, 114, 2), (130, 114, 2), (68, 114, 2), (82, 114, 2),
        (99, 114, 2), (94, 114, 2), (104, 114, 2), (3, 114, 3),
        (86, 117, 2), (130, 117, 2), (68, 117, 2), (82, 117, 2),
        (99, 117, 2), (94, 117, 2), (104, 117, 2), (3, 117, 3),
    ],
    // 143
    [
        (86, 115, 2), (130, 115, 2), (68, 115, 2), (82, 115, 2),
        (99, 115, 2), (94, 115, 2), (104, 115, 2), (3, 115, 3),
        (86, 116, 2), (130, 116, 2), (68, 116, 2), (82, 116, 2),
        (99, 116, 2), (94, 116, 2), (104, 116, 2), (3, 116, 3),
    ],
    // 144
    [
        (85, 119, 2), (67, 119, 2), (93, 119, 2), (2, 119, 3),
        (85, 120, 2), (67, 120, 2), (93, 120, 2), (2, 120, 3),
        (85, 121, 2), (67, 121, 2), (93, 121, 2), (2, 121, 3),
        (85, 122, 2), (67, 122, 2), (93, 122, 2), (2, 122, 3),
    ],
    // 145
    [
        (86, 119, 2), (130, 119, 2), (68, 119, 2), (82, 119, 2),
        (99, 119, 2), (94, 119, 2), (104, 119, 2), (3, 119, 3),
        (86, 120, 2), (130, 120, 2), (68, 120, 2), (82, 120, 2),
        (99, 120, 2), (94, 120, 2), (104, 120, 2), (3, 120, 3),
    ],
    // 146
    [
        (86, 121, 2), (130, 121, 2), (68, 121, 2), (82, 121, 2),
        (99, 121, 2), (94, 121, 2), (104, 121, 2), (3, 121, 3),
        (86, 122, 2), (130, 122, 2), (68, 122, 2), (82, 122, 2),
        (99, 122, 2), (94, 122, 2), (104, 122, 2), (3, 122, 3),
    ],
    // 147
    [
        (86, 127, 2), (130, 127, 2), (68, 127, 2), (82, 127, 2),
        (99, 127, 2), (94, 127, 2), (104, 127, 2), (3, 127, 3),
        (86, 220, 2), (130, 220, 2), (68, 220, 2), (82, 220, 2),
        (99, 220, 2), (94, 220, 2), (104, 220, 2), (3, 220, 3),
    ],
    // 148
    [
        (86, 208, 2), (130, 208, 2), (68, 208, 2), (82, 208, 2),
        (99, 208, 2), (94, 208, 2), (104, 208, 2), (3, 208, 3),
        (85, 128, 2), (67, 128, 2), (93, 128, 2), (2, 128, 3),
        (85, 130, 2), (67, 130, 2), (93, 130, 2), (2, 130, 3),
    ],
    // 149
    [
        (86, 128, 2), (130, 128, 2), (68, 128, 2), (82, 128, 2),
        (99, 128, 2), (94, 128, 2), (104, 128, 2), (3, 128, 3),
        (86, 130, 2), (130, 130, 2), (68, 130, 2), (82, 130, 2),
        (99, 130, 2), (94, 130, 2), (104, 130, 2), (3, 130, 3),
    ],
    // 150
    [
        (0, 176, 3), (0, 177, 3), (0, 179, 3), (0, 209, 3),
        (0, 216, 3), (0, 217, 3), (0, 227, 3), (0, 229, 3),
        (0, 230, 3), (154, 0, 0), (159, 0, 0), (160, 0, 0),
        (180, 0, 0), (182, 0, 0), (184, 0, 0), (190, 0, 0),
    ],
    // 151
    [
        (66, 230, 2), (1, 230, 3), (0, 129, 3), (0, 132, 3),
        (0, 133, 3), (0, 134, 3), (0, 136, 3), (0, 146, 3),
        (0, 154, 3), (0, 156, 3), (0, 160, 3), (0, 163, 3),
        (0, 164, 3), (0, 169, 3), (0, 170, 3), (0, 173, 3),
    ],
    // 152
    [
        (85, 230, 2), (67, 230, 2), (93, 230, 2), (2, 230, 3),
        (66, 129, 2), (1, 129, 3), (66, 132, 2), (1, 132, 3),
        (66, 133, 2), (1, 133, 3), (66, 134, 2), (1, 134, 3),
        (66, 136, 2), (1, 136, 3), (66, 146, 2), (1, 146, 3),
    ],
    // 153
    [
        (86, 230, 2), (130, 230, 2), (68, 230, 2), (82, 230, 2),
        (99, 230, 2), (94, 230, 2), (104, 230, 2), (3, 230, 3),
        (85, 129, 2), (67, 129, 2), (93, 129, 2), (2, 129, 3),
        (85, 132, 2), (67, 132, 2), (93, 132, 2), (2, 132, 3),
    ],
    // 154
    [
        (86, 129, 2), (130, 129, 2), (68, 129, 2), (82, 129, 2),
        (99, 129, 2), (94, 129, 2), (104, 129, 2), (3, 129, 3),
        (86, 132, 2), (130, 132, 2), (68, 132, 2), (82, 132, 2),
        (99, 132, 2), (94, 132, 2), (104, 132, 2), (3, 132, 3),
    ],
    // 155
    [
        (66, 131, 2), (1, 131, 3), (66, 162, 2), (1, 162, 3),
        (66, 184, 2), (1, 184, 3), (66, 194, 2), (1, 194, 3),
        (66, 224, 2), (1, 224, 3), (66, 226, 2), (1, 226, 3),
        (0, 153, 3), (0, 161, 3), (0, 167, 3), (0, 172, 3),
    ],
    // 156
    [
        (85, 131, 2), (67, 131, 2), (93, 131, 2), (2, 131, 3),
        (85, 162, 2), (67, 162, 2), (93, 162, 2), (2, 162, 3),
        (85, 184, 2), (67, 184, 2), (93, 184, 2), (2, 184, 3),
        (85, 194, 2), (67, 194, 2), (93, 194, 2), (2, 194, 3),
    ],
    // 157
    [
        (86, 131, 2), (130, 131, 2), (68, 131, 2), (82, 131, 2),
        (99, 131, 2), (94, 131, 2), (104, 131, 2), (3, 131, 3),
        (86, 162, 2), (130, 162, 2), (68, 162, 2), (82, 162, 2),
        (99, 162, 2), (94, 162, 2), (104, 162, 2), (3, 162, 3),
    ],
    // 158
    [
        (85, 133, 2), (67, 133, 2), (93, 133, 2), (2, 133, 3),
        (85, 134, 2), (67, 134, 2), (93, 134, 2), (2, 134, 3),
        (85, 136, 2), (67, 136, 2), (93, 136, 2), (2, 136, 3),
        (85, 146, 2), (67, 146, 2), (93, 146, 2), (2, 146, 3),
    ],
    // 159
    [
        (86, 133, 2), (130, 133, 2), (68, 133, 2), (82, 133, 2),
        (99, 133, 2), (94, 133, 2), (104, 133, 2), (3, 133, 3),
        (86, 134, 2), (130, 134, 2), (68, 134, 2), (82, 134, 2),
        (99, 134, 2), (94, 134, 2), (104, 134, 2), (3, 134, 3),
    ],
    // 160
    [
        (86, 136, 2), (130, 136, 2), (68, 136, 2), (82, 136, 2),
        (99, 136, 2), (94, 136, 2), (104, 136, 2), (3, 136, 3),
        (86, 146, 2), (130, 146, 2), (68, 146, 2), (82, 146, 2),
        (99, 146, 2), (94, 146, 2), (104, 146, 2), (3, 146, 3),
    ],
    // 161
    [
        (86, 137, 2), (130, 137, 2), (68, 137, 2), (82, 137, 2),
        (99, 137, 2), (94, 137, 2), (104, 137, 2), (3, 137, 3),
        (86, 138, 2), (130, 138, 2), (68, 138, 2), (82, 138, 2),
        (99, 138, 2), (94, 138, 2), (104, 138, 2), (3, 138, 3),
    ],
    // 162
    [
        (85, 139, 2), (67, 139, 2), (93, 139, 2), (2, 139, 3),
        (85, 140, 2), (67, 140, 2), (93, 140, 2), (2, 140, 3),
        (85, 141, 2), (67, 141, 2), (93, 141, 2), (2, 141, 3),
        (85, 143, 2), (67, 143, 2), (93, 143, 2), (2, 143, 3),
    ],
    // 163
    [
        (86, 139, 2), (130, 139, 2), (68, 139, 2), (82, 139, 2),
        (99, 139, 2), (94, 139, 2), (104, 139, 2), (3, 139, 3),
        (86, 140, 2), (130, 140, 2), (68, 140, 2), (82, 140, 2),
        (99, 140, 2), (94, 140, 2), (104, 140, 2), (3, 140, 3),
    ],
    // 164
    [
        (86, 141, 2), (130, 141, 2), (68, 141, 2), (82, 141, 2),
        (99, 141, 2), (94, 141, 2), (104, 141, 2), (3, 141, 3),
        (86, 143, 2), (130, 143, 2), (68, 143, 2), (82, 143, 2),
        (99, 143, 2), (94, 143, 2), (104, 143, 2), (3, 143, 3),
    ],
    // 165
    [
        (85, 144, 2), (67, 144, 2), (93, 144, 2), (2, 144, 3),
        (85, 145, 2), (67, 145, 2), (93, 145, 2), (2, 145, 3),
        (85, 148, 2), (67, 148, 2), (93, 148, 2), (2, 148, 3),
        (85, 159, 2), (67, 159, 2), (93, 159, 2), (2, 159, 3),
    ],
    // 166
    [
        (86, 144, 2), (130, 144, 2), (68, 144, 2), (82, 144, 2),
        (99, 144, 2), (94, 144, 2), (104, 144, 2), (3, 144, 3),
        (86, 145, 2), (130, 145, 2), (68, 145, 2), (82, 145, 2),
        (99, 145, 2), (94, 145, 2), (104, 145, 2), (3, 145, 3),
    ],
    // 167
    [
        (0, 147, 3), (0, 149, 3), (0, 150, 3), (0, 151, 3),
        (0, 152, 3), (0, 155, 3), (0, 157, 3), (0, 158, 3),
        (0, 165, 3), (0, 166, 3), (0, 168, 3), (0, 174, 3),
        (0, 175, 3), (0, 180, 3), (0, 182, 3), (0, 183, 3),
    ],
    // 168
    [
        (66, 147, 2), (1, 147, 3), (66, 149, 2), (1, 149, 3),
        (66, 150, 2), (1, 150, 3), (66, 151, 2), (1, 151, 3),
        (66, 152, 2), (1, 152, 3), (66, 155, 2), (1, 155, 3),
        (66, 157, 2), (1, 157, 3), (66, 158, 2), (1, 158, 3),
    ],
    // 169
    [
        (85, 147, 2), (67, 147, 2), (93, 147, 2), (2, 147, 3),
        (85, 149, 2), (67, 149, 2), (93, 149, 2), (2, 149, 3),
        (85, 150, 2), (67, 150, 2), (93, 150, 2), (2, 150, 3),
        (85, 151, 2), (67, 151, 2), (93, 151, 2), (2, 151, 3),
    ],
    // 170
    [
        (86, 147, 2), (130, 147, 2), (68, 147, 2), (82, 147, 2),
        (99, 147, 2), (94, 147, 2), (104, 147, 2), (3, 147, 3),
        (86, 149, 2), (130, 149, 2), (68, 149, 2), (82, 149, 2),
        (99, 149, 2), (94, 149, 2), (104, 149, 2), (3, 149, 3),
    ],
    // 171
    [
        (86, 148, 2), (130, 148, 2), (68, 148, 2), (82, 148, 2),
        (99, 148, 2), (94, 148, 2), (104, 148, 2), (3, 148, 3),
        (86, 159, 2), (130, 159, 2), (68, 159, 2), (82, 159, 2),
        (99, 159, 2), (94, 159, 2), (104, 159, 2), (3, 159, 3),
    ],
    // 172
    [
        (86, 150, 2), (130, 150, 2), (68, 150, 2), (82, 150, 2),
        (99, 150, 2), (94, 150, 2), (104, 150, 2), (3, 150, 3),
        (86, 151, 2), (130, 151, 2), (68, 151, 2), (82, 151, 2),
        (99, 151, 2), (94, 151, 2), (104, 151, 2), (3, 151, 3),
    ],
    // 173
    [
        (85, 152, 2), (67, 152, 2), (93, 152, 2), (2, 152, 3),
        (85, 155, 2), (67, 155, 2), (93, 155, 2), (2, 155, 3),
        (85, 157, 2), (67, 157, 2), (93, 157, 2), (2, 157, 3),
        (85, 158, 2), (67, 158, 2), (93, 158, 2), (2, 158, 3),
    ],
    // 174
    [
        (86, 152, 2), (130, 152, 2), (68, 152, 2), (82, 152, 2),
        (99, 152, 2), (94, 152, 2), (104, 152, 2), (3, 152, 3),
        (86, 155, 2), (130, 155, 2), (68, 155, 2), (82, 155, 2),
        (99, 155, 2), (94, 155, 2), (104, 155, 2), (3, 155, 3),
    ],
    // 175
    [
        (85, 224, 2), (67, 224, 2), (93, 224, 2), (2, 224, 3),
        (85, 226, 2), (67, 226, 2), (93, 226, 2), (2, 226, 3),
        (66, 153, 2), (1, 153, 3), (66, 161, 2), (1, 161, 3),
        (66, 167, 2), (1, 167, 3), (66, 172, 2), (1, 172, 3),
    ],
    // 176
    [
        (85, 153, 2), (67, 153, 2), (93, 153, 2), (2, 153, 3),
        (85, 161, 2), (67, 161, 2), (93, 161, 2), (2, 161, 3),
        (85, 167, 2), (67, 167, 2), (93, 167, 2), (2, 167, 3),
        (85, 172, 2), (67, 172, 2), (93, 172, 2), (2, 172, 3),
    ],
    // 177
    [
        (86, 153, 2), (130, 153, 2), (68, 153, 2), (82, 153, 2),
        (99, 153, 2), (94, 153, 2), (104, 153, 2), (3, 153, 3),
        (86, 161, 2), (130, 161, 2), (68, 161, 2), (82, 161, 2),
        (99, 161, 2), (94, 161, 2), (104, 161, 2), (3, 161, 3),
    ],
    // 178
    [
        (66, 154, 2), (1, 154, 3), (66, 156, 2), (1, 156, 3),
        (66, 160, 2), (1, 160, 3), (66, 163, 2), (1, 163, 3),
        (66, 164, 2), (1, 164, 3), (66, 169, 2), (1, 169, 3),
        (66, 170, 2), (1, 170, 3), (66, 173, 2), (1, 173, 3),
    ],
    // 179
    [
        (85, 154, 2), (67, 154, 2), (93, 154, 2), (2, 154, 3),
        (85, 156, 2), (67, 156, 2), (93, 156, 2), (2, 156, 3),
        (85, 160, 2), (67, 160, 2), (93, 160, 2), (2, 160, 3),
        (85, 163, 2), (67, 163, 2), (93, 163, 2), (2, 163, 3),
    ],
    // 180
    [
        (86, 154, 2), (130, 154, 2), (68, 154, 2), (82, 154, 2),
        (99, 154, 2), (94, 154, 2), (104, 154, 2), (3, 154, 3),
        (86, 156, 2), (130, 156, 2), (68, 156, 2), (82, 156, 2),
        (99, 156, 2), (94, 156, 2), (104, 156, 2), (3, 156, 3),
    ],
    // 181
    [
        (86, 157, 2), (130, 157, 2), (68, 157, 2), (82, 157, 2),
        (99, 157, 2), (94, 157, 2), (104, 157, 2), (3, 157, 3),
        (86, 158, 2), (130, 158, 2), (68, 158, 2), (82, 158, 2),
        (99, 158, 2), (94, 158, 2), (104, 158, 2), (3, 158, 3),
    ],
    // 182
    [
        (86, 160, 2), (130, 160, 2), (68, 160, 2), (82, 160, 2),
        (99, 160, 2), (94, 160, 2), (104, 160, 2), (3, 160, 3),
        (86, 163, 2), (130, 163, 2), (68, 163, 2), (82, 163, 2),
        (99, 163, 2), (94, 163, 2), (104, 163, 2), (3, 163, 3),
    ],
    // 183
    [
        (85, 164, 2), (67, 164, 2), (93, 164, 2), (2, 164, 3),
        (85, 169, 2), (67, 169, 2), (93, 169, 2), (2, 169, 3),
        (85, 170, 2), (67, 170, 2), (93, 170, 2), (2, 170, 3),
        (85, 173, 2), (67, 173, 2), (93, 173, 2), (2, 173, 3),
    ],
    // 184
    [
        (86, 164, 2), (130, 164, 2), (68, 164, 2), (82, 164, 2),
        (99, 164, 2), (94, 164, 2), (104, 164, 2), (3, 164, 3),
        (86, 169, 2), (130, 169, 2), (68, 169, 2), (82, 169, 2),
        (99, 169, 2), (94, 169, 2), (104, 169, 2), (3, 169, 3),
    ],
    // 185
    [
        (66, 165, 2), (1, 165, 3), (66, 166, 2), (1, 166, 3),
        (66, 168, 2), (1, 168, 3), (66, 174, 2), (1, 174, 3),
        (66, 175, 2), (1, 175, 3), (66, 180, 2), (1, 180, 3),
        (66, 182, 2), (1, 182, 3), (66, 183, 2), (1, 183, 3),
    ],
    // 186
    [
        (85, 165, 2), (67, 165, 2), (93, 165, 2), (2, 165, 3),
        (85, 166, 2), (67, 166, 2), (93, 166, 2), (2, 166, 3),
        (85, 168, 2), (67, 168, 2), (93, 168, 2), (2, 168, 3),
        (85, 174, 2), (67, 174, 2), (93, 174, 2), (2, 174, 3),
    ],
    // 187
    [
        (86, 165, 2), (130, 165, 2), (68, 165, 2), (82, 165, 2),
        (99, 165, 2), (94, 165, 2), (104, 165, 2), (3, 165, 3),
        (86, 166, 2), (130, 166, 2), (68, 166, 2), (82, 166, 2),
        (99, 166, 2), (94, 166, 2), (104, 166, 2), (3, 166, 3),
    ],
    // 188
    [
        (86, 167, 2), (130, 167, 2), (68, 167, 2), (82, 167, 2),
        (99, 167, 2), (94, 167, 2), (104, 167, 2), (3, 167, 3),
        (86, 172, 2), (130, 172, 2), (68, 172, 2), (82, 172, 2),
        (99, 172, 2), (94, 172, 2), (104, 172, 2), (3, 172, 3),
    ],
    // 189
    [
        (86, 168, 2), (130, 168, 2), (68, 168, 2), (82, 168, 2),
        (99, 168, 2), (94, 168, 2), (104, 168, 2), (3, 168, 3),
        (86, 174, 2), (130, 174, 2), (68, 174, 2), (82, 174, 2),
        (99, 174, 2), (94, 174, 2), (104, 174, 2), (3, 174, 3),
    ],
    // 190
    [
        (86, 170, 2), (130, 170, 2), (68, 170, 2), (82, 170, 2),
        (99, 170, 2), (94, 170, 2), (104, 170, 2), (3, 170, 3),
        (86, 173, 2), (130, 173, 2), (68, 173, 2), (82, 173, 2),
        (99, 173, 2), (94, 173, 2), (104, 173, 2), (3, 173, 3),
    ],
    // 191
    [
        (66, 171, 2), (1, 171, 3), (66, 206, 2), (1, 206, 3),
        (66, 215, 2), (1, 215, 3), (66, 225, 2), (1, 225, 3),
        (66, 236, 2), (1, 236, 3), (66, 237, 2), (1, 237, 3),
        (0, 199, 3), (0, 207, 3), (0, 234, 3), (0, 235, 3),
    ],
    // 192
    [
        (85, 171, 2), (67, 171, 2), (93, 171, 2), (2, 171, 3),
        (85, 206, 2), (67, 206, 2), (93, 206, 2), (2, 206, 3),
        (85, 215, 2), (67, 215, 2), (93, 215, 2), (2, 215, 3),
        (85, 225, 2), (67, 225, 2), (93, 225, 2), (2, 225, 3),
    ],
    // 193
    [
        (86, 171, 2), (130, 171, 2), (68, 171, 2), (82, 171, 2),
        (99, 171, 2), (94, 171, 2), (104, 171, 2), (3, 171, 3),
        (86, 206, 2), (130, 206, 2), (68, 206, 2), (82, 206, 2),
        (99, 206, 2), (94, 206, 2), (104, 206, 2), (3, 206, 3),
    ],
    // 194
    [
        (85, 175, 2), (67, 175, 2), (93, 175, 2), (2, 175, 3),
        (85, 180, 2), (67, 180, 2), (93, 180, 2), (2, 180, 3),
        (85, 182, 2), (67, 182, 2), (93, 182, 2), (2, 182, 3),
        (85, 183, 2), (67, 183, 2), (93, 183, 2), (2, 183, 3),
    ],
    // 195
    [
        (86, 175, 2), (130, 175, 2), (68, 175, 2), (82, 175, 2),
        (99, 175, 2), (94, 175, 2), (104, 175, 2), (3, 175, 3),
        (86, 180, 2), (130, 180, 2), (68, 180, 2), (82, 180, 2),
        (99, 180, 2), (94, 180, 2), (104, 180, 2), (3, 180, 3),
    ],
    // 196
    [
        (66, 176, 2), (1, 176, 3), (66, 177, 2), (1, 177, 3),
        (66, 179, 2), (1, 179, 3), (66, 209, 2), (1, 209, 3),
        (66, 216, 2), (1, 216, 3), (66, 217, 2), (1, 217, 3),
        (66, 227, 2), (1, 227, 3), (66, 229, 2), (1, 229, 3),
    ],
    // 197
    [
        (85, 176, 2), (67, 176, 2), (93, 176, 2), (2, 176, 3),
        (85, 177, 2), (67, 177, 2), (93, 177, 2), (2, 177, 3),
        (85, 179, 2), (67, 179, 2), (93, 179, 2), (2, 179, 3),
        (85, 209, 2), (67, 209, 2), (93, 209, 2), (2, 209, 3),
    ],
    // 198
    [
        (86, 176, 2), (130, 176, 2), (68, 176, 2), (82, 176, 2),
        (99, 176, 2), (94, 176, 2), (104, 176, 2), (3, 176, 3),
        (86, 177, 2), (130, 177, 2), (68, 177, 2), (82, 177, 2),
        (99, 177, 2), (94, 177, 2), (104, 177, 2), (3, 177, 3),
    ],
    // 199
    [
        (66, 178, 2), (1, 178, 3), (66, 181, 2), (1, 181, 3),
        (66, 185, 2), (1, 185, 3), (66, 186, 2), (1, 186, 3),
        (66, 187, 2), (1, 187, 3), (66, 189, 2), (1, 189, 3),
        (66, 190, 2), (1, 190, 3), (66, 196, 2), (1, 196, 3),
    ],
    // 200
    [
        (85, 178, 2), (67, 178, 2), (93, 178, 2), (2, 178, 3),
        (85, 181, 2), (67, 181, 2), (93, 181, 2), (2, 181, 3),
        (85, 185, 2), (67, 185, 2), (93, 185, 2), (2, 185, 3),
        (85, 186, 2), (67, 186, 2), (93, 186, 2), (2, 186, 3),
    ],
    // 201
    [
        (86, 178, 2), (130, 178, 2), (68, 178, 2), (82, 178, 2),
        (99, 178, 2), (94, 178, 2), (104, 178, 2), (3, 178, 3),
        (86, 181, 2), (130, 181, 2), (68, 181, 2), (82, 181, 2),
        (99, 181, 2), (94, 181, 2), (104, 181, 2), (3, 181, 3),
    ],
    // 202
    [
        (86, 179, 2), (130, 179, 2), (68, 179, 2), (82, 179, 2),
        (99, 179, 2), (94, 179, 2), (104, 179, 2), (3, 179, 3),
        (86, 209, 2), (130, 209, 2), (68, 209, 2), (82, 209, 2),
        (99, 209, 2), (94, 209, 2), (104, 209, 2), (3, 209, 3),
    ],
    // 203
    [
        (86, 182, 2), (130, 182, 2), (68, 182, 2), (82, 182, 2),
        (99, 182, 2), (94, 182, 2), (104, 182, 2), (3, 182, 3),
        (86, 183, 2), (130, 183, 2), (68, 183, 2), (82, 183, 2),
        (99, 183, 2), (94, 183, 2), (104, 183, 2), (3, 183, 3),
    ],
    // 204
    [
        (86, 184, 2), (130, 184, 2), (68, 184, 2), (82, 184, 2),
        (99, 184, 2), (94, 184, 2), (104, 184, 2), (3, 184, 3),
        (86, 194, 2), (130, 194, 2), (68, 194, 2), (82, 194, 2),
        (99, 194, 2), (94, 194, 2), (104, 194, 2), (3, 194, 3),
    ],
    // 205
    [
        (86, 185, 2), (130, 185, 2), (68, 185, 2), (82, 185, 2),
        (99, 185, 2), (94, 185, 2), (104, 185, 2), (3, 185, 3),
        (86, 186, 2), (130, 186, 2), (68, 186, 2), (82, 186, 2),
        (99, 186, 2), (94, 186, 2), (104, 186, 2), (3, 186, 3),
    ],
    // 206
    [
        (85, 187, 2), (67, 187, 2), (93, 187, 2), (2, 187, 3),
        (85, 189, 2), (67, 189, 2), (93, 189, 2), (2, 189, 3),
        (85, 190, 2), (67, 190, 2), (93, 190, 2), (2, 190, 3),
        (85, 196, 2), (67, 196, 2), (93, 196, 2), (2, 196, 3),
    ],
    // 207
    [
        (86, 187, 2), (130, 187, 2), (68, 187, 2), (82, 187, 2),
        (99, 187, 2), (94, 187, 2), (104, 187, 2), (3, 187, 3),
        (86, 189, 2), (130, 189, 2), (68, 189, 2), (82, 189, 2),
        (99, 189, 2), (94, 189, 2), (104, 189, 2), (3, 189, 3),
    ],
    // 208
    [
        (85, 188, 2), (67, 188, 2), (93, 188, 2), (2, 188, 3),
        (85, 191, 2), (67, 191, 2), (93, 191, 2), (2, 191, 3),
        (85, 197, 2), (67, 197, 2), (93, 197, 2), (2, 197, 3),
        (85, 231, 2), (67, 231, 2), (93, 231, 2), (2, 231, 3),
    ],
    // 209
    [
        (86, 188, 2), (130, 188, 2), (68, 188, 2), (82, 188, 2),
        (99, 188, 2), (94, 188, 2), (104, 188, 2), (3, 188, 3),
        (86, 191, 2), (130, 191, 2), (68, 191, 2), (82, 191, 2),
        (99, 191, 2), (94, 191, 2), (104, 191, 2), (3, 191, 3),
    ],
    // 210
    [
        (86, 190, 2), (130, 190, 2), (68, 190, 2), (82, 190, 2),
        (99, 190, 2), (94, 190, 2), (104, 190, 2), (3, 190, 3),
        (86, 196, 2), (130, 196, 2), (68, 196, 2), (82, 196, 2),
        (99, 196, 2), (94, 196, 2), (104, 196, 2), (3, 196, 3),
    ],
    // 211
    [
        (0, 192, 3), (0, 193, 3), (0, 200, 3), (0, 201, 3),
        (0, 202, 3), (0, 205, 3), (0, 210, 3), (0, 213, 3),
        (0, 218, 3), (0, 219, 3), (0, 238, 3), (0, 240, 3),
        (0, 242, 3), (0, 243, 3), (0, 255, 3), (227, 0, 0),
    ],
    // 212
    [
        (66, 192, 2), (1, 192, 3), (66, 193, 2), (1, 193, 3),
        (66, 200, 2), (1, 200, 3), (66, 201, 2), (1, 201, 3),
        (66, 202, 2), (1, 202, 3), (66, 205, 2), (1, 205, 3),
        (66, 210, 2), (1, 210, 3), (66, 213, 2), (1, 213, 3),
    ],
    // 213
    [
        (85, 192, 2), (67, 192, 2), (93, 192, 2), (2, 192, 3),
        (85, 193, 2), (67, 193, 2), (93, 193, 2), (2, 193, 3),
        (85, 200, 2), (67, 200, 2), (93, 200, 2), (2, 200, 3),
        (85, 201, 2), (67, 201, 2), (93, 201, 2), (2, 201, 3),
    ],
    // 214
    [
        (86, 192, 2), (130, 192, 2), (68, 192, 2), (82, 192, 2),
        (99, 192, 2), (94, 192, 2), (104, 192, 2), (3, 192, 3),
        (86, 193, 2), (130, 193, 2), (68, 193, 2), (82, 193, 2),
        (99, 193, 2), (94, 193, 2), (104, 193, 2), (3, 193, 3),
    ],
    // 215
    [
        (86, 197, 2), (130, 197, 2), (68, 197, 2), (82, 197, 2),
        (99, 197, 2), (94, 197, 2), (104, 197, 2), (3, 197, 3),
        (86, 231, 2), (130, 231, 2), (68, 231, 2), (82, 231, 2),
        (99, 231, 2), (94, 231, 2), (104, 231, 2), (3, 231, 3),
    ],
    // 216
    [
        (85, 198, 2), (67, 198, 2), (93, 198, 2), (2, 198, 3),
        (85, 228, 2), (67, 228, 2), (93, 228, 2), (2, 228, 3),
        (85, 232, 2), (67, 232, 2), (93, 232, 2), (2, 232, 3),
        (85, 233, 2), (67, 233, 2), (93, 233, 2), (2, 233, 3),
    ],
    // 217
    [
        (86, 198, 2), (130, 198, 2), (68, 198, 2), (82, 198, 2),
        (99, 198, 2), (94, 198, 2), (104, 198, 2), (3, 198, 3),
        (86, 228, 2), (130, 228, 2), (68, 228, 2), (82, 228, 2),
        (99, 228, 2), (94, 228, 2), (104, 228, 2), (3, 228, 3),
    ],
    // 218
    [
        (85, 236, 2), (67, 236, 2), (93, 236, 2), (2, 236, 3),
        (85, 237, 2), (67, 237, 2), (93, 237, 2), (2, 237, 3),
        (66, 199, 2), (1, 199, 3), (66, 207, 2), (1, 207, 3),
        (66, 234, 2), (1, 234, 3), (66, 235, 2), (1, 235, 3),
    ],
    // 219
    [
        (85, 199, 2), (67, 199, 2), (93, 199, 2), (2, 199, 3),
        (85, 207, 2), (67, 207, 2), (93, 207, 2), (2, 207, 3),
        (85, 234, 2), (67, 234, 2), (93, 234, 2), (2, 234, 3),
        (85, 235, 2), (67, 235, 2), (93, 235, 2), (2, 235, 3),
    ],
    // 220
    [
        (86, 199, 2), (130, 199, 2), (68, 199, 2), (82, 199, 2),
        (99, 199, 2), (94, 199, 2), (104, 199, 2), (3, 199, 3),
        (86, 207, 2), (130, 207, 2), (68, 207, 2), (82, 207, 2),
        (99, 207, 2), (94, 207, 2), (104, 207, 2), (3, 207, 3),
    ],
    // 221
    [
        (86, 200, 2), (130, 200, 2), (68, 200, 2), (82, 200, 2),
        (99, 200, 2), (94, 200, 2), (104, 200, 2), (3, 200, 3),
        (86, 201, 2), (130, 201, 2), (68, 201, 2), (82, 201, 2),
        (99, 201, 2), (94, 201, 2), (104, 201, 2), (3, 201, 3),
    ],
    // 222
    [
        (85, 202, 2), (67, 202, 2), (93, 202, 2), (2, 202, 3),
        (85, 205, 2), (67, 205, 2), (93, 205, 2), (2, 205, 3),
        (85, 210, 2), (67, 210, 2), (93, 210, 2), (2, 210, 3),
        (85, 213, 2), (67, 213, 2), (93, 213, 2), (2, 213, 3),
    ],
    // 223
    [
        (86, 202, 2), (130, 202, 2), (68, 202, 2), (82, 202, 2),
        (99, 202, 2), (94, 202, 2), (104, 202, 2), (3, 202, 3),
        (86, 205, 2), (130, 205, 2), (68, 205, 2), (82, 205, 2),
        (99, 205, 2), (94, 205, 2), (104, 205, 2), (3, 205, 3),
    ],
    // 224
    [
        (66, 218, 2), (1, 218, 3), (66, 219, 2), (1, 219, 3),
        (66, 238, 2), (1, 238, 3), (66, 240, 2), (1, 240, 3),
        (66, 242, 2), (1, 242, 3), (66, 243, 2), (1, 243, 3),
        (66, 255, 2), (1, 255, 3), (0, 203, 3), (0, 204, 3),
    ],
    // 225
    [
        (85, 242, 2), (67, 242, 2), (93, 242, 2), (2, 242, 3),
        (85, 243, 2), (67, 243, 2), (93, 243, 2), (2, 243, 3),
        (85, 255, 2), (67, 255, 2), (93, 255, 2), (2, 255, 3),
        (66, 203, 2), (1, 203, 3), (66, 204, 2), (1, 204, 3),
    ],
    // 226
    [
        (86, 255, 2), (130, 255, 2), (68, 255, 2), (82, 255, 2),
        (99, 255, 2), (94, 255, 2), (104, 255, 2), (3, 255, 3),
        (85, 203, 2), (67, 203, 2), (93, 203, 2), (2, 203, 3),
        (85, 204, 2), (67, 204, 2), (93, 204, 2), (2, 204, 3),
    ],
    // 227
    [
        (86, 203, 2), (130, 203, 2), (68, 203, 2), (82, 203, 2),
        (99, 203, 2), (94, 203, 2), (104, 203, 2), (3, 203, 3),
        (86, 204, 2), (130, 204, 2), (68, 204, 2), (82, 204, 2),
        (99, 204, 2), (94, 204, 2), (104, 204, 2), (3, 204, 3),
    ],
    // 228
    [
        (86, 210, 2), (130, 210, 2), (68, 210, 2), (82, 210, 2),
        (99, 210, 2), (94, 210, 2), (104, 210, 2), (3, 210, 3),
        (86, 213, 2), (130, 213, 2), (68, 213, 2), (82, 213, 2),
        (99, 213, 2), (94, 213, 2), (104, 213, 2), (3, 213, 3),
    ],
    // 229
    [
        (0, 211, 3), (0, 212, 3), (0, 214, 3), (0, 221, 3),
        (0, 222, 3), (0, 223, 3), (0, 241, 3), (0, 244, 3),
        (0, 245, 3), (0, 246, 3), (0, 247, 3), (0, 248, 3),
        (0, 250, 3), (0, 251, 3), (0, 252, 3), (0, 253, 3),
    ],
    // 230
    [
        (66, 211, 2), (1, 211, 3), (66, 212, 2), (1, 212, 3),
        (66, 214, 2), (1, 214, 3), (66, 221, 2), (1, 221, 3),
        (66, 222, 2), (1, 222, 3), (66, 223, 2), (1, 223, 3),
        (66, 241, 2), (1, 241, 3), (66, 244, 2), (1, 244, 3),
    ],
    // 231
    [
        (85, 211, 2), (67, 211, 2), (93, 211, 2), (2, 211, 3),
        (85, 212, 2), (67, 212, 2), (93, 212, 2), (2, 212, 3),
        (85, 214, 2), (67, 214, 2), (93, 214, 2), (2, 214, 3),
        (85, 221, 2), (67, 221, 2), (93, 221, 2), (2, 221, 3),
    ],
    // 232
    [
        (86, 211, 2), (130, 211, 2), (68, 211, 2), (82, 211, 2),
        (99, 211, 2), (94, 211, 2), (104, 211, 2), (3, 211, 3),
        (86, 212, 2), (130, 212, 2), (68, 212, 2), (82, 212, 2),
        (99, 212, 2), (94, 212, 2), (104, 212, 2), (3, 212, 3),
    ],
    // 233
    [
        (86, 214, 2), (130, 214, 2), (68, 214, 2), (82, 214, 2),
        (99, 214, 2), (94, 214, 2), (104, 214, 2), (3, 214, 3),
        (86, 221, 2), (130, 221, 2), (68, 221, 2), (82, 221, 2),
        (99, 221, 2), (94, 221, 2), (104, 221, 2), (3, 221, 3),
    ],
    // 234
    [
        (86, 215, 2), (130, 215, 2), (68, 215, 2), (82, 215, 2),
        (99, 215, 2), (94, 215, 2), (104, 215, 2), (3, 215, 3),
        (86, 225, 2), (130, 225, 2), (68, 225, 2), (82, 225, 2),
        (99, 225, 2), (94, 225, 2), (104, 225, 2), (3, 225, 3),
    ],
    // 235
    [
        (85, 216, 2), (67, 216, 2), (93, 216, 2), (2, 216, 3),
        (85, 217, 2), (67, 217, 2), (93, 217, 2), (2, 217, 3),
        (85, 227, 2), (67, 227, 2), (93, 227, 2), (2, 227, 3),
        (85, 229, 2), (67, 229, 2), (93, 229, 2), (2, 229, 3),
    ],
    // 236
    [
        (86, 216, 2), (130, 216, 2), (68, 216, 2), (82, 216, 2),
        (99, 216, 2), (94, 216, 2), (104, 216, 2), (3, 216, 3),
        (86, 217, 2), (130, 217, 2), (68, 217, 2), (82, 217, 2),
        (99, 217, 2), (94, 217, 2), (104, 217, 2), (3, 217, 3),
    ],
    // 237
    [
        (85, 218, 2), (67, 218, 2), (93, 218, 2), (2, 218, 3),
        (85, 219, 2), (67, 219, 2), (93, 219, 2), (2, 219, 3),
        (85, 238, 2), (67, 238, 2), (93, 238, 2), (2, 238, 3),
        (85, 240, 2), (67, 240, 2), (93, 240, 2), (2, 240, 3),
    ],
    // 238
    [
        (86, 218, 2), (130, 218, 2), (68, 218, 2), (82, 218, 2),
        (99, 218, 2), (94, 218, 2), (104, 218, 2), (3, 218, 3),
        (86, 219, 2), (130, 219, 2), (68, 219, 2), (82, 219, 2),
        (99, 219, 2), (94, 219, 2), (104, 219, 2), (3, 219, 3),
    ],
    // 239
    [
        (85, 222, 2), (67, 222, 2), (93, 222, 2), (2, 222, 3),
        (85, 223, 2), (67, 223, 2), (93, 223, 2), (2, 223, 3),
        (85, 241, 2), (67, 241, 2), (93, 241, 2), (2, 241, 3),
        (85, 244, 2), (67, 244, 2), (93, 244, 2), (2, 244, 3),
    ],
    // 240
    [
        (86, 222, 2), (130, 222, 2), (68, 222, 2), (82, 222, 2),
        (99, 222, 2), (94, 222, 2), (104, 222, 2), (3, 222, 3),
        (86, 223, 2), (130, 223, 2), (68, 223, 2), (82, 223, 2),
        (99, 223, 2), (94, 223, 2), (104, 223, 2), (3, 223, 3),
    ],
    // 241
    [
        (86, 224, 2), (130, 224, 2), (68, 224, 2), (82, 224, 2),
        (99, 224, 2), (94, 224, 2), (104, 224, 2), (3, 224, 3),
        (86, 226, 2), (130, 226, 2), (68, 226, 2), (82, 226, 2),
        (99, 226, 2), (94, 226, 2), (104, 226, 2), (3, 226, 3),
    ],
    // 242
    [
        (86, 227, 2), (130, 227, 2), (68, 227, 2), (82, 227, 2),
        (99, 227, 2), (94, 227, 2), (104, 227, 2), (3, 227, 3),
        (86, 229, 2), (130, 229, 2), (68, 229, 2), (82, 229, 2),
        (99, 229, 2), (94, 229, 2), (104, 229, 2), (3, 229, 3),
    ],
    // 243
    [
        (86, 232, 2), (130, 232, 2), (68, 232, 2), (82, 232, 2),
        (99, 232, 2), (94, 232, 2), (104, 232, 2), (3, 232, 3),
        (86, 233, 2), (130, 233, 2), (68, 233, 2), (82, 233, 2),
        (99, 233, 2), (94, 233, 2), (104, 233, 2), (3, 233, 3),
    ],
    // 244
    [
        (86, 234, 2), (130, 234, 2), (68, 234, 2), (82, 234, 2),
        (99, 234, 2), (94, 234, 2), (104, 234, 2), (3, 234, 3),
        (86, 235, 2), (130, 235, 2), (68, 235, 2), (82, 235, 2),
        (99, 235, 2), (94, 235, 2), (104, 235, 2), (3, 235, 3),
    ],
    // 245
    [
        (86, 236, 2), (130, 236, 2), (68, 236, 2), (82, 236, 2),
        (99, 236, 2), (94, 236, 2), (104, 236, 2), (3, 236, 3),
        (86, 237, 2), (130, 237, 2), (68, 237, 2), (82, 237, 2),
        (99, 237, 2), (94, 237, 2), (104, 237, 2), (3, 237, 3),
    ],
    // 246
    [
        (86, 238, 2), (130, 238, 2), (68, 238, 2), (82, 238, 2),
        (99, 238, 2), (94, 238, 2), (104, 238, 2), (3, 238, 3),
        (86, 240, 2), (130, 240, 2), (68, 240, 2), (82, 240, 2),
        (99, 240, 2), (94, 240, 2), (104, 240, 2), (3, 240, 3),
    ],
    // 247
    [
        (86, 241, 2), (130, 241, 2), (68, 241, 2), (82, 241, 2),
        (99, 241, 2), (94, 241, 2), (104, 241, 2), (3, 241, 3),
        (86, 244, 2), (130, 244, 2), (68, 244, 2), (82, 244, 2),
        (99, 244, 2), (94, 244, 2), (104, 244, 2), (3, 244, 3),
    ],
    // 248
    [
        (86, 242, 2), (130, 242, 2), (68, 242, 2), (82, 242, 2),
        (99, 242, 2), (94, 242, 2), (104, 242, 2), (3, 242, 3),
        (86, 243, 2), (130, 243, 2), (68, 243, 2), (82, 243, 2),
        (99, 243, 2), (94, 243, 2), (104, 243, 2), (3, 243, 3),
    ],
    // 249
    [
        (66, 245, 2), (1, 245, 3), (66, 246, 2), (1, 246, 3),
        (66, 247, 2), (1, 247, 3), (66, 248, 2), (1, 248, 3),
        (66, 250, 2), (1, 250, 3), (66, 251, 2), (1, 251, 3),
        (66, 252, 2), (1, 252, 3), (66, 253, 2), (1, 253, 3),
    ],
    // 250
    [
        (85, 245, 2), (67, 245, 2), (93, 245, 2), (2, 245, 3),
        (85, 246, 2), (67, 246, 2), (93, 246, 2), (2, 246, 3),
        (85, 247, 2), (67, 247, 2), (93, 247, 2), (2, 247, 3),
        (85, 248, 2), (67, 248, 2), (93, 248, 2), (2, 248, 3),
    ],
    // 251
    [
        (86, 245, 2), (130, 245, 2), (68, 245, 2), (82, 245, 2),
        (99, 245, 2), (94, 245, 2), (104, 245, 2), (3, 245, 3),
        (86, 246, 2), (130, 246, 2), (68, 246, 2), (82, 246, 2),
        (99, 246, 2), (94, 246, 2), (104, 246, 2), (3, 246, 3),
    ],
    // 252
    [
        (86, 247, 2), (130, 247, 2), (68, 247, 2), (82, 247, 2),
        (99, 247, 2), (94, 247, 2), (104, 247, 2), (3, 247, 3),
        (86, 248, 2), (130, 248, 2), (68, 248, 2), (82, 248, 2),
        (99, 248, 2), (94, 248, 2), (104, 248, 2), (3, 248, 3),
    ],
    // 253
    [
        (85, 250, 2), (67, 250, 2), (93, 250, 2), (2, 250, 3),
        (85, 251, 2), (67, 251, 2), (93, 251, 2), (2, 251, 3),
        (85, 252, 2), (67, 252, 2), (93, 252, 2), (2, 252, 3),
        (85, 253, 2), (67, 253, 2), (93, 253, 2), (2, 253, 3),
    ],
    // 254
    [
        (86, 250, 2), (130, 250, 2), (68, 250, 2), (82, 250, 2),
        (99, 250, 2), (94, 250, 2), (104, 250, 2), (3, 250, 3),
        (86, 251, 2), (130, 251, 2), (68, 251, 2), (82, 251, 2),
        (99, 251, 2), (94, 251, 2), (104, 251, 2), (3, 251, 3),
    ],
    // 255
    [
        (86, 252, 2), (130, 252, 2), (68, 252, 2), (82, 252, 2),
        (99, 252, 2), (94, 252, 2), (104, 252, 2), (3, 252, 3),
        (86, 253, 2), (130, 253, 2), (68, 253, 2), (82, 253, 2),
        (99, 253, 2), (94, 253, 2), (104, 253, 2), (3, 253, 3),
    ],
];
