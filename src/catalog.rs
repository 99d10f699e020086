//! Ruin coordinates by level and area, in exploration order.

use serde::Serialize;

/// One map point, in game coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub const fn new(x: u32, y: u32) -> Self {
        Coord { x, y }
    }

    /// Key used in the explored-ruins file: `"x,y"`.
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

pub struct Area {
    pub name: &'static str,
    pub coords: &'static [Coord],
}

pub struct Level {
    pub name: &'static str,
    pub areas: &'static [Area],
}

/// A catalog entry together with where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub level: &'static str,
    pub area: &'static str,
    pub coord: Coord,
}

pub struct Catalog {
    pub levels: &'static [Level],
}

impl Catalog {
    /// Every site in (level, area, coordinate) order.
    pub fn sites(&self) -> impl Iterator<Item = Site> + '_ {
        self.levels.iter().flat_map(|level| {
            level.areas.iter().flat_map(move |area| {
                area.coords.iter().map(move |&coord| Site {
                    level: level.name,
                    area: area.name,
                    coord,
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| l.areas)
            .map(|a| a.coords.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const fn c(x: u32, y: u32) -> Coord {
    Coord::new(x, y)
}

pub static RUINS: Catalog = Catalog { levels: LEVELS };

const LEVELS: &[Level] = &[
    Level {
        name: "Level 1",
        areas: &[
            Area {
                name: "Area 1 (Founding of the Three Kingdoms)",
                coords: &[
                    c(15, 149), c(33, 175), c(34, 110), c(73, 58), c(119, 50), c(130, 85),
                    c(133, 133), c(140, 88), c(157, 131), c(156, 90), c(172, 111), c(180, 59),
                    c(193, 26), c(193, 45), c(200, 151), c(211, 43), c(214, 34), c(226, 36),
                    c(238, 72), c(243, 39), c(246, 30), c(266, 90), c(270, 57), c(289, 128),
                    c(310, 120), c(314, 60), c(350, 55),
                ],
            },
            Area {
                name: "Area 2 (Discovering Relics)",
                coords: &[
                    c(57, 214), c(68, 211), c(94, 206), c(111, 221), c(136, 224), c(144, 180),
                    c(152, 222), c(158, 198), c(206, 170), c(29, 361), c(62, 315), c(67, 359),
                    c(78, 263), c(92, 255), c(101, 332), c(124, 318), c(133, 350), c(155, 282),
                    c(9, 480), c(17, 495), c(19, 455), c(27, 464), c(48, 491), c(63, 405),
                    c(108, 422), c(115, 392), c(123, 377),
                ],
            },
            Area {
                name: "Area 3 (War in the Three Kingdoms)",
                coords: &[
                    c(49, 575), c(52, 557), c(64, 532), c(71, 559), c(81, 620), c(96, 566),
                    c(114, 574), c(132, 583), c(138, 593), c(17, 746), c(18, 710), c(21, 721),
                    c(32, 637), c(36, 710), c(37, 726), c(53, 727), c(55, 639), c(71, 711),
                    c(46, 777), c(54, 819), c(63, 800), c(67, 753), c(84, 736), c(84, 826),
                    c(100, 790), c(102, 798), c(126, 805),
                ],
            },
            Area {
                name: "Area 4 (The Gnome Invasion)",
                coords: &[
                    c(76, 840), c(143, 880), c(152, 833), c(152, 853), c(152, 860), c(153, 921),
                    c(164, 893), c(172, 834), c(194, 834), c(191, 895), c(205, 937), c(221, 873),
                    c(265, 862), c(275, 890), c(279, 865), c(298, 957), c(306, 908), c(314, 932),
                ],
            },
            Area {
                name: "Area 5 (A New Summons)",
                coords: &[
                    c(449, 961), c(455, 981), c(467, 966), c(472, 985), c(487, 934), c(508, 902),
                    c(525, 923), c(544, 931), c(565, 950), c(581, 932), c(585, 965), c(596, 975),
                ],
            },
            Area {
                name: "Area 6 (History of the Magic Academy)",
                coords: &[
                    c(639, 950), c(665, 883), c(670, 856), c(680, 961), c(681, 858), c(691, 875),
                    c(708, 900), c(712, 878), c(724, 892), c(727, 912), c(729, 947), c(739, 942),
                ],
            },
            Area {
                name: "Area 7 (The Dragons and the Treasury)",
                coords: &[
                    c(800, 871), c(842, 865), c(843, 925), c(866, 907), c(868, 900), c(891, 874),
                    c(894, 901), c(904, 842), c(910, 855), c(843, 770), c(843, 805), c(851, 813),
                    c(888, 761), c(892, 791), c(892, 821), c(912, 762), c(913, 778), c(916, 753),
                ],
            },
            Area {
                name: "Area 8 (Sea Trade)",
                coords: &[
                    c(960, 922), c(972, 905), c(976, 925), c(977, 870), c(996, 869), c(1011, 868),
                    c(1012, 910), c(1016, 846), c(1021, 884), c(1059, 886), c(1091, 879),
                    c(1094, 900), c(1095, 891), c(1104, 835), c(1115, 907), c(1137, 854),
                    c(1149, 844), c(1159, 833), c(1032, 936), c(1037, 926), c(1062, 948),
                    c(1072, 940), c(1077, 932), c(1104, 977), c(1113, 924), c(1123, 966),
                    c(1133, 948),
                ],
            },
            Area {
                name: "Area 9 (The Call of the Three Kingdoms)",
                coords: &[
                    c(972, 791), c(990, 821), c(1013, 754), c(1022, 823), c(1023, 746),
                    c(1033, 850), c(1036, 778), c(1036, 817), c(1046, 778), c(1103, 782),
                    c(1116, 730), c(1138, 782), c(1139, 717), c(1143, 775), c(1155, 786),
                    c(1164, 781), c(1179, 755), c(1180, 765),
                ],
            },
            Area {
                name: "Area 10 (The Doomsday Prophecy)",
                coords: &[
                    c(1052, 715), c(1063, 636), c(1067, 726), c(1073, 697), c(1075, 688),
                    c(1119, 670), c(1121, 624), c(1139, 629), c(1139, 664), c(1012, 574),
                    c(1016, 585), c(1020, 608), c(1038, 555), c(1039, 593), c(1041, 562),
                    c(1058, 575), c(1067, 573), c(1096, 599),
                ],
            },
            Area {
                name: "Area 11 (Harold's Ice Wall)",
                coords: &[
                    c(1073, 438), c(1102, 417), c(1103, 475), c(1105, 496), c(1116, 449),
                    c(1122, 487), c(1134, 535), c(1138, 547), c(1144, 415), c(1043, 348),
                    c(1053, 343), c(1070, 383), c(1072, 346), c(1079, 303), c(1102, 377),
                    c(1110, 397), c(1152, 402), c(1153, 414),
                ],
            },
            Area {
                name: "Area 12 (The Royal Alchemist Academy)",
                coords: &[
                    c(1008, 261), c(1031, 239), c(1040, 199), c(1041, 220), c(1042, 287),
                    c(1052, 206), c(1065, 217), c(1075, 238), c(1079, 278), c(1055, 197),
                    c(1093, 148), c(1101, 244), c(1107, 142), c(1118, 216), c(1120, 185),
                    c(1129, 151), c(1149, 221), c(1156, 168),
                ],
            },
            Area {
                name: "Area 13 (Sovereign Tomb)",
                coords: &[
                    c(943, 228), c(944, 175), c(961, 149), c(968, 174), c(984, 147), c(1008, 128),
                    c(1020, 199), c(1039, 137), c(1053, 136), c(1023, 70), c(1024, 43), c(1037, 98),
                    c(1045, 76), c(1073, 114), c(1112, 98), c(1134, 70), c(1152, 68), c(1169, 113),
                ],
            },
            Area {
                name: "Area 14 (Hornheim's Disappearance)",
                coords: &[
                    c(732, 123), c(737, 87), c(753, 141), c(769, 84), c(773, 163), c(787, 226),
                    c(797, 202), c(801, 123), c(811, 123), c(848, 124), c(853, 92), c(853, 105),
                    c(885, 93), c(901, 115), c(919, 62), c(954, 113), c(986, 123), c(1007, 101),
                ],
            },
            Area {
                name: "Area 15 (The Empire Crumbles)",
                coords: &[
                    c(361, 82), c(375, 141), c(378, 56), c(389, 108), c(394, 140), c(400, 182),
                    c(426, 68), c(449, 93), c(451, 131), c(468, 72), c(487, 87), c(497, 63),
                    c(501, 99), c(505, 65), c(514, 144), c(517, 113), c(526, 172), c(554, 107),
                    c(568, 160), c(579, 142), c(595, 73), c(601, 96), c(608, 74), c(629, 93),
                    c(647, 182), c(673, 115), c(710, 87),
                ],
            },
        ],
    },
    Level {
        name: "Level 2",
        areas: &[
            Area {
                name: "Area 16 (Sage Council)",
                coords: &[
                    c(145, 260), c(155, 267), c(167, 286), c(170, 329), c(177, 278), c(224, 222),
                    c(239, 222), c(243, 232), c(255, 262), c(242, 199), c(257, 231), c(269, 231),
                    c(283, 203), c(306, 165), c(309, 192), c(338, 129), c(365, 160), c(368, 141),
                ],
            },
            Area {
                name: "Area 17 (Enigma Lieu)",
                coords: &[
                    c(140, 392), c(144, 459), c(151, 353), c(154, 367), c(164, 447), c(165, 405),
                    c(180, 425), c(184, 378), c(190, 412), c(211, 369), c(214, 430), c(235, 353),
                ],
            },
            Area {
                name: "Area 18 (Well of Time)",
                coords: &[
                    c(151, 468), c(155, 483), c(192, 558), c(193, 520), c(208, 442), c(210, 542),
                    c(229, 537), c(233, 509), c(246, 549), c(264, 557), c(280, 514), c(300, 536),
                ],
            },
            Area {
                name: "Area 19 (The First Gnome Invasion)",
                coords: &[
                    c(129, 726), c(149, 700), c(172, 723), c(184, 690), c(190, 664), c(198, 687),
                    c(211, 708), c(212, 642), c(218, 705), c(244, 655), c(258, 654), c(266, 683),
                    c(117, 642), c(125, 631), c(127, 653), c(161, 614), c(167, 641), c(177, 570),
                    c(178, 613), c(195, 617), c(203, 644), c(204, 606), c(247, 606), c(261, 645),
                ],
            },
            Area {
                name: "Area 20 (Above and Below)",
                coords: &[
                    c(226, 840), c(258, 809), c(270, 801), c(273, 844), c(284, 828), c(295, 767),
                    c(308, 760), c(321, 751), c(341, 770), c(149, 763), c(174, 755), c(179, 783),
                    c(224, 781), c(238, 707), c(241, 773), c(278, 704), c(282, 691), c(298, 738),
                ],
            },
            Area {
                name: "Area 21 (Summoning Ban)",
                coords: &[
                    c(483, 835), c(494, 859), c(516, 809), c(517, 754), c(523, 809), c(535, 806),
                    c(543, 782), c(556, 789), c(571, 809), c(352, 860), c(363, 884), c(374, 894),
                    c(386, 844), c(386, 871), c(403, 926), c(418, 928), c(419, 845), c(423, 916),
                ],
            },
            Area {
                name: "Area 22 (World Heart)",
                coords: &[
                    c(642, 846), c(646, 858), c(657, 841), c(663, 765), c(673, 766), c(686, 835),
                    c(690, 853), c(698, 740), c(726, 847), c(553, 893), c(557, 868), c(572, 854),
                    c(574, 894), c(590, 899), c(591, 892), c(596, 938), c(604, 900), c(609, 911),
                ],
            },
            Area {
                name: "Area 23 (Terrifying Rumors)",
                coords: &[
                    c(835, 665), c(836, 692), c(840, 681), c(856, 674), c(856, 684), c(875, 694),
                    c(880, 728), c(889, 684), c(890, 668), c(717, 801), c(718, 750), c(738, 804),
                    c(740, 812), c(772, 776), c(784, 778), c(788, 816), c(814, 815), c(820, 807),
                ],
            },
            Area {
                name: "Area 24 (Founding of the Empire)",
                coords: &[
                    c(885, 605), c(915, 620), c(915, 653), c(918, 667), c(925, 666), c(927, 644),
                    c(943, 661), c(945, 599), c(947, 653), c(948, 588), c(965, 606), c(975, 656),
                    c(926, 764), c(929, 705), c(930, 777), c(933, 743), c(956, 787), c(958, 726),
                    c(967, 697), c(975, 762), c(980, 751), c(978, 688), c(1006, 667), c(1022, 671),
                ],
            },
            Area {
                name: "Area 25 (Five Great Kingdoms)",
                coords: &[
                    c(899, 367), c(933, 323), c(936, 399), c(955, 385), c(958, 475), c(959, 416),
                    c(974, 394), c(1011, 368), c(1016, 347), c(977, 447), c(989, 435), c(1003, 404),
                    c(1016, 481), c(1024, 388), c(1036, 470), c(1041, 440), c(1047, 410),
                    c(1085, 398),
                ],
            },
            Area {
                name: "Area 26 (The Gnome's Birth and Exile)",
                coords: &[
                    c(877, 254), c(888, 260), c(910, 256), c(922, 267), c(927, 292), c(932, 285),
                    c(933, 304), c(936, 316), c(952, 280), c(953, 243), c(958, 264), c(960, 328),
                    c(978, 298), c(982, 321), c(991, 287),
                ],
            },
            Area {
                name: "Area 27 (The War of Five Kingdoms)",
                coords: &[
                    c(752, 234), c(754, 200), c(758, 213), c(763, 301), c(787, 306), c(792, 343),
                    c(799, 293), c(804, 314), c(836, 283), c(816, 200), c(820, 211), c(833, 224),
                    c(880, 220), c(899, 188), c(908, 154), c(911, 229), c(914, 194), c(931, 188),
                ],
            },
            Area {
                name: "Area 28 (The Alchemists)",
                coords: &[
                    c(367, 186), c(414, 209), c(420, 267), c(426, 191), c(428, 247), c(453, 204),
                    c(467, 249), c(493, 222), c(501, 228), c(518, 253), c(538, 241), c(539, 251),
                    c(546, 188), c(554, 217), c(558, 266), c(572, 233), c(600, 192), c(624, 199),
                    c(646, 226), c(669, 224), c(695, 183), c(696, 192), c(697, 158), c(706, 152),
                    c(706, 216), c(722, 214), c(734, 172),
                ],
            },
            Area {
                name: "Area 29 (Hornheim)",
                coords: &[
                    c(337, 282), c(341, 210), c(358, 224), c(358, 235), c(360, 246), c(362, 196),
                    c(364, 276), c(369, 251), c(383, 307), c(386, 234), c(406, 283), c(415, 291),
                ],
            },
        ],
    },
    Level {
        name: "Level 3",
        areas: &[
            Area {
                name: "Area 30 (Stela of New World)",
                coords: &[
                    c(268, 379), c(285, 252), c(289, 361), c(299, 330), c(301, 263), c(309, 257),
                    c(310, 275), c(315, 315), c(356, 332), c(260, 397), c(276, 411), c(287, 419),
                    c(295, 453), c(314, 454), c(326, 423), c(335, 383), c(338, 402), c(397, 420),
                ],
            },
            Area {
                name: "Area 31 (Temple of Norheim)",
                coords: &[
                    c(269, 666), c(279, 581), c(296, 678), c(332, 570), c(333, 556), c(343, 615),
                    c(376, 589), c(386, 547), c(395, 567), c(336, 710), c(344, 751), c(356, 656),
                    c(357, 756), c(367, 712), c(373, 668), c(381, 741), c(386, 624), c(406, 636),
                ],
            },
            Area {
                name: "Area 32 (History of the Tribes)",
                coords: &[
                    c(362, 821), c(384, 808), c(401, 821), c(421, 812), c(426, 758), c(457, 815),
                    c(466, 752), c(477, 775), c(490, 742), c(437, 658), c(494, 652), c(504, 694),
                    c(508, 644), c(518, 666), c(522, 699), c(535, 688), c(539, 673), c(543, 682),
                    c(526, 745), c(539, 748), c(565, 756), c(569, 708), c(591, 728), c(600, 730),
                    c(612, 708), c(624, 759), c(626, 774),
                ],
            },
            Area {
                name: "Area 33 (Forbidden Zone)",
                coords: &[
                    c(739, 677), c(740, 707), c(747, 748), c(774, 643), c(775, 740), c(777, 692),
                    c(790, 690), c(800, 657), c(812, 688), c(801, 621), c(808, 650), c(809, 664),
                    c(818, 593), c(825, 648), c(830, 615), c(837, 622), c(837, 632), c(878, 604),
                ],
            },
            Area {
                name: "Area 34 (Creation and the Guardians)",
                coords: &[
                    c(925, 497), c(932, 554), c(935, 500), c(942, 571), c(950, 534), c(960, 493),
                    c(984, 510), c(989, 547), c(991, 554), c(998, 538), c(1014, 504), c(1039, 507),
                ],
            },
            Area {
                name: "Area 35 (The Energy Circle)",
                coords: &[
                    c(801, 548), c(806, 558), c(859, 515), c(868, 523), c(868, 533), c(893, 564),
                    c(897, 511), c(903, 492), c(907, 483), c(804, 390), c(822, 399), c(842, 400),
                    c(853, 413), c(861, 363), c(862, 329), c(876, 356), c(886, 375), c(900, 331),
                ],
            },
            Area {
                name: "Area 36 (The Destruction of Civilization)",
                coords: &[
                    c(661, 276), c(675, 271), c(691, 253), c(693, 272), c(705, 328), c(708, 311),
                    c(721, 292), c(727, 264), c(727, 314), c(729, 294), c(738, 265), c(738, 333),
                ],
            },
            Area {
                name: "Area 37 (The Memory Modification)",
                coords: &[
                    c(463, 325), c(471, 291), c(486, 287), c(498, 343), c(501, 329), c(511, 286),
                    c(517, 358), c(538, 337), c(544, 310), c(545, 345), c(563, 357), c(576, 352),
                ],
            },
        ],
    },
];
